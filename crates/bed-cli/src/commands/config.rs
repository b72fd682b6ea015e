//! Effective configuration.

use super::Environment;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use bed_config_and_utils::Config;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Settings after file and environment overrides, with resolved paths.
#[derive(Debug, Serialize)]
pub struct EffectiveConfig {
    pub config_file: PathBuf,
    pub log_database: PathBuf,
    pub log_file: PathBuf,
    #[serde(flatten)]
    pub config: Config,
}

impl EffectiveConfig {
    pub fn resolve(env: &Environment) -> Self {
        Self {
            config_file: env.paths.config_file(),
            log_database: env.config.log_database_path(&env.paths),
            log_file: env.paths.log_file(),
            config: env.config.clone(),
        }
    }
}

impl fmt::Display for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", output::row("Config file", self.config_file.display()))?;
        writeln!(f, "{}", output::row("Log level", &self.config.log_level))?;
        writeln!(f, "{}", output::row("Max retries", self.config.max_delivery_retries))?;
        writeln!(f, "{}", output::row("Storage", self.config.storage.as_str()))?;
        writeln!(f, "{}", output::row("Log database", self.log_database.display()))?;
        writeln!(f, "{}", output::row("Log file", self.log_file.display()))?;
        write!(f, "{}", output::row("Pool size", self.config.pool_max_size))?;
        if self.config.data_sources.is_empty() {
            write!(f, "\n{}", output::row("Data sources", "(none)"))?;
        }
        for (name, path) in &self.config.data_sources {
            write!(f, "\n{}", output::row(&format!("  {}", name), path.display()))?;
        }
        Ok(())
    }
}

pub fn config_show(env: &Environment, format: &OutputFormat) -> Result<()> {
    output::print(&EffectiveConfig::resolve(env), format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bed_config_and_utils::Paths;

    #[test]
    fn resolves_paths_under_base_dir() {
        let paths = Paths::with_base_dir(PathBuf::from("/srv/bed"));
        let mut config = Config::default();
        config
            .data_sources
            .insert("ds_0".to_string(), PathBuf::from("/data/ds_0.sqlite"));
        let effective = EffectiveConfig::resolve(&Environment { paths, config });

        assert_eq!(effective.log_database, PathBuf::from("/srv/bed/transaction_log.sqlite"));
        assert_eq!(effective.log_file, PathBuf::from("/srv/bed/logs/bed.jsonl"));

        let text = effective.to_string();
        assert!(text.contains("Max retries:     10"));
        assert!(text.contains("/data/ds_0.sqlite"));

        let json = serde_json::to_value(&effective).unwrap();
        assert_eq!(json["max_delivery_retries"], 10);
        assert_eq!(json["storage"], "sqlite");
    }
}
