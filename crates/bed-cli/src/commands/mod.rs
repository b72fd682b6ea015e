//! CLI command implementations.

mod config;
mod exec;
mod log;

pub use config::config_show;
pub use exec::{exec, parse_param, ExecArgs};
pub use log::{pending, show};

use anyhow::{Context, Result};
use bed_config_and_utils::{Config, Paths};
use bed_database::{create_log_storage, PoolConfig, TransactionLogStorage};
use std::sync::Arc;

/// Resolved paths plus the configuration loaded from them.
pub struct Environment {
    pub paths: Paths,
    pub config: Config,
}

impl Environment {
    /// Load the config under `paths`, with environment overrides applied.
    pub fn load(paths: Paths) -> Result<Self> {
        let config = Config::load(&paths)
            .with_context(|| format!("loading {}", paths.config_file().display()))?;
        Ok(Self { paths, config })
    }

    /// Open the configured transaction log.
    pub fn log_storage(&self) -> Result<Arc<dyn TransactionLogStorage>> {
        let path = self.config.log_database_path(&self.paths);
        let pool = PoolConfig::with_max_size(self.config.pool_max_size);
        create_log_storage(self.config.storage, &path, &pool)
            .with_context(|| format!("opening transaction log at {}", path.display()))
    }
}
