//! File system paths.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Resolves the on-disk locations used by the `bed` tools.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory (~/.bed)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.bed`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".bed"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.bed).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.bed/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the default transaction log database (~/.bed/transaction_log.sqlite).
    pub fn log_database_file(&self) -> PathBuf {
        self.base_dir.join("transaction_log.sqlite")
    }

    /// Get the logs directory (~/.bed/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file (~/.bed/logs/bed.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("bed.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
