//! In-process transaction log.

use super::TransactionLogStorage;
use crate::{DatabaseError, DatabaseResult, TransactionLogEntry};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Transaction log kept in a map. Does not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryTransactionLogStorage {
    entries: RwLock<HashMap<String, TransactionLogEntry>>,
}

impl MemoryTransactionLogStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionLogStorage for MemoryTransactionLogStorage {
    fn add(&self, entry: &TransactionLogEntry) -> DatabaseResult<()> {
        let mut entries = self.entries.write();
        if entries.contains_key(&entry.id) {
            return Err(DatabaseError::DuplicateEntry(entry.id.clone()));
        }
        entries.insert(entry.id.clone(), entry.clone());
        debug!(id = %entry.id, "Transaction log entry added");
        Ok(())
    }

    fn remove(&self, id: &str) -> DatabaseResult<bool> {
        Ok(self.entries.write().remove(id).is_some())
    }

    fn find(&self, id: &str) -> DatabaseResult<Option<TransactionLogEntry>> {
        Ok(self.entries.read().get(id).cloned())
    }

    fn pending(&self, limit: usize) -> DatabaseResult<Vec<TransactionLogEntry>> {
        let mut entries: Vec<TransactionLogEntry> = self.entries.read().values().cloned().collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        entries.truncate(limit);
        Ok(entries)
    }

    fn count(&self) -> DatabaseResult<usize> {
        Ok(self.entries.read().len())
    }
}
