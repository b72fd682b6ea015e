//! Transaction log storages.
//!
//! The delivery core only needs `add` and `remove`; the read operations serve
//! operators and reconciliation tooling.

mod memory;
mod sqlite;

pub use memory::MemoryTransactionLogStorage;
pub use sqlite::SqliteTransactionLogStorage;

use crate::{DatabaseResult, PoolConfig, TransactionLogEntry};
use bed_config_and_utils::StorageType;
use std::path::Path;
use std::sync::Arc;

/// Durable record of statements awaiting confirmed delivery.
///
/// Implementations are shared between worker threads. Calls for different
/// ids must not interfere; calls for the same id are never issued
/// concurrently by the delivery core.
pub trait TransactionLogStorage: Send + Sync {
    /// Persist `entry`. Fails with `DuplicateEntry` if its id is present.
    fn add(&self, entry: &TransactionLogEntry) -> DatabaseResult<()>;

    /// Delete the entry with `id`. Returns whether an entry was deleted;
    /// removing a missing id is not an error.
    fn remove(&self, id: &str) -> DatabaseResult<bool>;

    /// Look up a single entry.
    fn find(&self, id: &str) -> DatabaseResult<Option<TransactionLogEntry>>;

    /// Up to `limit` entries, oldest first.
    fn pending(&self, limit: usize) -> DatabaseResult<Vec<TransactionLogEntry>>;

    /// Number of entries in the log.
    fn count(&self) -> DatabaseResult<usize>;
}

/// Open the storage selected by `storage`.
///
/// `path` is only used by the SQLite storage.
pub fn create_log_storage(
    storage: StorageType,
    path: &Path,
    pool_config: &PoolConfig,
) -> DatabaseResult<Arc<dyn TransactionLogStorage>> {
    Ok(match storage {
        StorageType::Memory => Arc::new(MemoryTransactionLogStorage::new()),
        StorageType::Sqlite => Arc::new(SqliteTransactionLogStorage::open(path, pool_config)?),
    })
}
