//! SQLite layer for best-efforts delivery.
//!
//! This crate provides:
//! - Model types for transaction log entries and bound parameters
//! - Transaction log storages (in-memory and SQLite) behind one trait
//! - Schema migrations for the SQLite transaction log
//! - Connection traits the delivery core retries through, with an
//!   r2d2-pooled SQLite implementation keyed by data-source name

mod connection;
mod data_source;
mod error;
mod migrations;
mod models;
mod pool;
pub mod storage;

pub use connection::{ConnectionProvider, DeliveryConnection, OwnedConnection};
pub use data_source::SqliteDataSources;
pub use error::{DatabaseError, DatabaseResult};
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use models::{ParameterValue, TransactionLogEntry, TransactionType};
pub use pool::{open_pool, PoolConfig, PoolState};
pub use storage::{
    create_log_storage, MemoryTransactionLogStorage, SqliteTransactionLogStorage,
    TransactionLogStorage,
};
