//! Named SQLite data sources, each behind its own r2d2 pool.

use crate::connection::ConnectionProvider;
use crate::pool::{configure_connection, ensure_parent_dir, open_pool, PoolConfig, PoolState};
use crate::{DatabaseError, DatabaseResult};
use bed_config_and_utils::Config;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

struct DataSource {
    path: PathBuf,
    pool: Pool<SqliteConnectionManager>,
}

/// Registry of target data sources the delivery core writes to.
#[derive(Default)]
pub struct SqliteDataSources {
    sources: HashMap<String, DataSource>,
}

impl SqliteDataSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with one pool per data source in `config`.
    pub fn from_config(config: &Config) -> DatabaseResult<Self> {
        let pool_config = PoolConfig::with_max_size(config.pool_max_size);
        let mut sources = Self::new();
        for (name, path) in &config.data_sources {
            sources.register(name, path, &pool_config)?;
        }
        Ok(sources)
    }

    /// Register (or replace) the data source `name` backed by `path`.
    pub fn register(&mut self, name: &str, path: &Path, config: &PoolConfig) -> DatabaseResult<()> {
        let pool = open_pool(path, config)?;
        self.sources.insert(
            name.to_string(),
            DataSource {
                path: path.to_path_buf(),
                pool,
            },
        );
        debug!(data_source = %name, path = %path.display(), "Data source registered");
        Ok(())
    }

    /// Registered data-source names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Pool statistics for a data source.
    pub fn state(&self, name: &str) -> Option<PoolState> {
        self.sources.get(name).map(|s| s.pool.state().into())
    }

    fn source(&self, name: &str) -> DatabaseResult<&DataSource> {
        self.sources
            .get(name)
            .ok_or_else(|| DatabaseError::UnknownDataSource(name.to_string()))
    }
}

impl ConnectionProvider for SqliteDataSources {
    type Pooled = PooledConnection<SqliteConnectionManager>;
    type Fresh = Connection;

    fn pooled_connection(&self, data_source: &str) -> DatabaseResult<Self::Pooled> {
        Ok(self.source(data_source)?.pool.get()?)
    }

    fn new_connection(&self, data_source: &str) -> DatabaseResult<Self::Fresh> {
        let path = &self.source(data_source)?.path;
        ensure_parent_dir(path)?;
        let conn = Connection::open(path)?;
        configure_connection(&conn)?;
        debug!(data_source = %data_source, "Opened new connection outside the pool");
        Ok(conn)
    }
}
