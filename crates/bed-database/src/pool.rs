//! r2d2 connection pools over SQLite files.

use crate::{DatabaseError, DatabaseResult};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Configuration for a connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum connections in the pool.
    pub max_size: u32,
    /// Minimum idle connections to maintain.
    pub min_idle: Option<u32>,
    /// Connection acquisition timeout.
    pub connection_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            min_idle: Some(1),
            connection_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    pub fn with_max_size(max_size: u32) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    /// Total connections (active + idle).
    pub connections: u32,
    /// Currently idle connections.
    pub idle_connections: u32,
}

impl From<r2d2::State> for PoolState {
    fn from(state: r2d2::State) -> Self {
        Self {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }
}

/// Pragmas applied to every connection, pooled or not.
pub(crate) fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )
}

pub(crate) fn ensure_parent_dir(path: &Path) -> DatabaseResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Open a connection pool over the SQLite file at `path`.
///
/// Creates the file and its parent directory if needed.
pub fn open_pool(path: &Path, config: &PoolConfig) -> DatabaseResult<Pool<SqliteConnectionManager>> {
    ensure_parent_dir(path)?;

    let manager = SqliteConnectionManager::file(path).with_init(|conn| configure_connection(conn));

    let pool = Pool::builder()
        .max_size(config.max_size)
        .min_idle(config.min_idle)
        .connection_timeout(config.connection_timeout)
        .build(manager)
        .map_err(DatabaseError::Pool)?;

    info!(
        path = %path.display(),
        max_size = config.max_size,
        "Connection pool created"
    );

    Ok(pool)
}
