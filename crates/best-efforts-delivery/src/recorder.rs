//! Write-ahead / confirm wrapper around the transaction log.

use crate::DeliveryResult;
use bed_database::{TransactionLogEntry, TransactionLogStorage};
use std::sync::Arc;
use tracing::debug;

/// Records statement intent before execution and clears it on confirmed
/// delivery. Never removes an entry because something failed.
#[derive(Clone)]
pub struct LogRecorder {
    storage: Arc<dyn TransactionLogStorage>,
}

impl LogRecorder {
    pub fn new(storage: Arc<dyn TransactionLogStorage>) -> Self {
        Self { storage }
    }

    /// Underlying storage, for read-side tooling.
    pub fn storage(&self) -> &Arc<dyn TransactionLogStorage> {
        &self.storage
    }

    pub fn add(&self, entry: &TransactionLogEntry) -> DeliveryResult<()> {
        self.storage.add(entry)?;
        debug!(
            event_id = %entry.id,
            transaction_id = %entry.transaction_id,
            data_source = %entry.data_source,
            "Statement logged before execution"
        );
        Ok(())
    }

    /// Idempotent: clearing an id that is not logged succeeds.
    pub fn remove(&self, id: &str) -> DeliveryResult<()> {
        let removed = self.storage.remove(id)?;
        debug!(event_id = %id, removed, "Statement delivery confirmed");
        Ok(())
    }
}
