//! SQLite-backed transaction log.

use super::TransactionLogStorage;
use crate::pool::open_pool;
use crate::{
    migrations, DatabaseError, DatabaseResult, ParameterValue, PoolConfig, PoolState,
    TransactionLogEntry, TransactionType,
};
use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::debug;

const SELECT_COLUMNS: &str =
    "SELECT id, transaction_id, transaction_type, data_source, sql_text, parameters, created_at
     FROM transaction_log";

/// Transaction log in a dedicated SQLite database.
pub struct SqliteTransactionLogStorage {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl SqliteTransactionLogStorage {
    /// Open (creating if needed) the log database at `path` and migrate it.
    pub fn open(path: &Path, config: &PoolConfig) -> DatabaseResult<Self> {
        let pool = open_pool(path, config)?;
        {
            let conn = pool.get()?;
            migrations::run_migrations(&conn)?;
        }
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Get the database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get pool statistics for monitoring.
    pub fn state(&self) -> PoolState {
        self.pool.state().into()
    }
}

impl TransactionLogStorage for SqliteTransactionLogStorage {
    fn add(&self, entry: &TransactionLogEntry) -> DatabaseResult<()> {
        let conn = self.pool.get()?;
        let parameters = serde_json::to_string(&entry.parameters)?;
        let result = conn.execute(
            "INSERT INTO transaction_log (id, transaction_id, transaction_type, data_source, sql_text, parameters, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.transaction_id,
                entry.transaction_type.as_str(),
                entry.data_source,
                entry.sql,
                parameters,
                format_datetime(&entry.created_at),
            ],
        );

        match result {
            Ok(_) => {
                debug!(id = %entry.id, data_source = %entry.data_source, "Transaction log entry added");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(DatabaseError::DuplicateEntry(entry.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, id: &str) -> DatabaseResult<bool> {
        let conn = self.pool.get()?;
        let deleted = conn.execute("DELETE FROM transaction_log WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn find(&self, id: &str) -> DatabaseResult<Option<TransactionLogEntry>> {
        let conn = self.pool.get()?;
        let raw = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                RawEntry::from_row,
            )
            .optional()?;
        raw.map(RawEntry::into_entry).transpose()
    }

    fn pending(&self, limit: usize) -> DatabaseResult<Vec<TransactionLogEntry>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY created_at ASC, id ASC LIMIT ?1",
            SELECT_COLUMNS
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], RawEntry::from_row)?;

        let mut entries = Vec::new();
        for raw in rows {
            entries.push(raw?.into_entry()?);
        }
        Ok(entries)
    }

    fn count(&self) -> DatabaseResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM transaction_log", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}

/// Row as stored, before the typed columns are decoded.
struct RawEntry {
    id: String,
    transaction_id: String,
    transaction_type: String,
    data_source: String,
    sql: String,
    parameters: String,
    created_at: String,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            transaction_id: row.get(1)?,
            transaction_type: row.get(2)?,
            data_source: row.get(3)?,
            sql: row.get(4)?,
            parameters: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_entry(self) -> DatabaseResult<TransactionLogEntry> {
        let transaction_type = TransactionType::parse(&self.transaction_type).ok_or_else(|| {
            DatabaseError::InvalidData(format!(
                "unknown transaction type {:?} for entry {}",
                self.transaction_type, self.id
            ))
        })?;
        let parameters: Vec<ParameterValue> = serde_json::from_str(&self.parameters)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                DatabaseError::InvalidData(format!("bad created_at for entry {}: {}", self.id, e))
            })?;

        Ok(TransactionLogEntry {
            id: self.id,
            transaction_id: self.transaction_id,
            transaction_type,
            data_source: self.data_source,
            sql: self.sql,
            parameters,
            created_at,
        })
    }
}

/// Fixed-width UTC timestamps so lexical order matches time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}
