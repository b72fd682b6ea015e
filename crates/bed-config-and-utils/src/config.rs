//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default number of synchronous delivery attempts after a failed execution.
pub const DEFAULT_MAX_DELIVERY_RETRIES: u32 = 10;

/// Default maximum connections per data-source pool.
pub const DEFAULT_POOL_MAX_SIZE: u32 = 8;

const ENV_LOG_LEVEL: &str = "BED_LOG_LEVEL";
const ENV_MAX_DELIVERY_RETRIES: &str = "BED_MAX_DELIVERY_RETRIES";

/// Backend holding the transaction log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Process-local map. Lost on restart.
    Memory,
    /// SQLite database file.
    #[default]
    Sqlite,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Upper bound on delivery attempts after the original failure.
    #[serde(default = "default_max_delivery_retries")]
    pub max_delivery_retries: u32,
    /// Transaction log backend.
    #[serde(default)]
    pub storage: StorageType,
    /// Transaction log database file. Defaults to `~/.bed/transaction_log.sqlite`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_database: Option<PathBuf>,
    /// Target data sources, by name, each backed by a SQLite file.
    #[serde(default)]
    pub data_sources: BTreeMap<String, PathBuf>,
    /// Maximum pooled connections per data source.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_max_delivery_retries() -> u32 {
    DEFAULT_MAX_DELIVERY_RETRIES
}

fn default_pool_max_size() -> u32 {
    DEFAULT_POOL_MAX_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_delivery_retries: DEFAULT_MAX_DELIVERY_RETRIES,
            storage: StorageType::default(),
            log_database: None,
            data_sources: BTreeMap::new(),
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from the config file under `paths`, falling back to
    /// defaults, then apply environment overrides and validate.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file under `paths`.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Apply `BED_LOG_LEVEL` and `BED_MAX_DELIVERY_RETRIES` from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_MAX_DELIVERY_RETRIES) {
            self.max_delivery_retries = raw.trim().parse().map_err(|_| {
                CoreError::Config(format!(
                    "{} must be a positive integer, got {:?}",
                    ENV_MAX_DELIVERY_RETRIES, raw
                ))
            })?;
        }
        Ok(())
    }

    /// Reject settings the delivery core cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_delivery_retries == 0 {
            return Err(CoreError::Config(
                "max_delivery_retries must be at least 1".to_string(),
            ));
        }
        if self.pool_max_size == 0 {
            return Err(CoreError::Config(
                "pool_max_size must be at least 1".to_string(),
            ));
        }
        if let Some(name) = self.data_sources.keys().find(|name| name.trim().is_empty()) {
            return Err(CoreError::Config(format!(
                "data source name must not be empty (got {:?})",
                name
            )));
        }
        Ok(())
    }

    /// Effective transaction log database path.
    pub fn log_database_path(&self, paths: &Paths) -> PathBuf {
        self.log_database
            .clone()
            .unwrap_or_else(|| paths.log_database_file())
    }
}
