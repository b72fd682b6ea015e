//! Read-only views of the transaction log.

use super::Environment;
use crate::output::{self, OutputFormat};
use anyhow::{anyhow, Result};
use bed_database::{TransactionLogEntry, TransactionLogStorage};
use serde::Serialize;
use std::fmt;

/// Entries still awaiting confirmed delivery, oldest first.
#[derive(Debug, Serialize)]
pub struct PendingList {
    pub total: usize,
    pub entries: Vec<TransactionLogEntry>,
}

impl fmt::Display for PendingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "No pending entries");
        }
        writeln!(
            f,
            "{:<36} {:<12} {:<25} {}",
            "ID", "Data Source", "Created", "SQL"
        )?;
        writeln!(f, "{}", "-".repeat(100))?;
        for entry in &self.entries {
            writeln!(
                f,
                "{:<36} {:<12} {:<25} {}",
                output::truncate(&entry.id, 36),
                output::truncate(&entry.data_source, 12),
                entry.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                output::truncate(&entry.sql, 40)
            )?;
        }
        write!(f, "Showing {} of {} pending", self.entries.len(), self.total)
    }
}

pub fn list_pending(storage: &dyn TransactionLogStorage, limit: usize) -> Result<PendingList> {
    Ok(PendingList {
        total: storage.count()?,
        entries: storage.pending(limit)?,
    })
}

pub fn pending(env: &Environment, limit: usize, format: &OutputFormat) -> Result<()> {
    let storage = env.log_storage()?;
    output::print(&list_pending(storage.as_ref(), limit)?, format)
}

/// One entry with every field spelled out.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct EntryDetail(pub TransactionLogEntry);

impl fmt::Display for EntryDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = &self.0;
        writeln!(f, "{}", output::row("ID", &entry.id))?;
        writeln!(f, "{}", output::row("Transaction", &entry.transaction_id))?;
        writeln!(f, "{}", output::row("Type", entry.transaction_type))?;
        writeln!(f, "{}", output::row("Data source", &entry.data_source))?;
        writeln!(f, "{}", output::row("Created", entry.created_at.to_rfc3339()))?;
        writeln!(f, "{}", output::row("SQL", &entry.sql))?;
        write!(f, "{}", output::row("Parameters", entry.parameters.len()))?;
        for (index, value) in entry.parameters.iter().enumerate() {
            write!(f, "\n    {:>3}. {}", index + 1, value)?;
        }
        Ok(())
    }
}

pub fn find_entry(storage: &dyn TransactionLogStorage, id: &str) -> Result<EntryDetail> {
    storage
        .find(id)?
        .map(EntryDetail)
        .ok_or_else(|| anyhow!("no pending entry with id '{}'", id))
}

pub fn show(env: &Environment, id: &str, format: &OutputFormat) -> Result<()> {
    let storage = env.log_storage()?;
    output::print(&find_entry(storage.as_ref(), id)?, format)
}
