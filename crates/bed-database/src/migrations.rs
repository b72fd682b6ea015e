//! Transaction log schema migrations.
//!
//! Migrations run in order and are tracked in the `migrations` table. Each
//! step commits together with its tracking row.

use crate::DatabaseResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> DatabaseResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version >= CURRENT_VERSION {
        debug!(current_version, "Transaction log schema up to date");
        return Ok(());
    }

    info!(
        current_version,
        target_version = CURRENT_VERSION,
        "Running transaction log migrations"
    );

    if current_version < 1 {
        migrate_v1_transaction_log(conn)?;
    }
    if current_version < 2 {
        migrate_v2_transaction_log_indexes(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: one row per statement awaiting confirmed delivery.
fn migrate_v1_transaction_log(conn: &Connection) -> DatabaseResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS transaction_log (
            id TEXT PRIMARY KEY NOT NULL,
            transaction_id TEXT NOT NULL,
            transaction_type TEXT NOT NULL,
            data_source TEXT NOT NULL,
            sql_text TEXT NOT NULL,
            parameters TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        );
        ",
    )?;
    record_migration(&tx, 1, "transaction_log")?;
    tx.commit()?;
    Ok(())
}

/// V2: lookup by age (reconciliation order) and by owning transaction.
fn migrate_v2_transaction_log_indexes(conn: &Connection) -> DatabaseResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_transaction_log_created_at
            ON transaction_log(created_at, id);
        CREATE INDEX IF NOT EXISTS idx_transaction_log_transaction_id
            ON transaction_log(transaction_id);
        ",
    )?;
    record_migration(&tx, 2, "transaction_log_indexes")?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied_versions(conn: &Connection) -> Vec<i32> {
        let mut stmt = conn
            .prepare("SELECT version FROM migrations ORDER BY version")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn migrations_create_transaction_log() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM transaction_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(applied_versions(&conn), vec![1, 2]);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(applied_versions(&conn), vec![1, 2]);
    }

    #[test]
    fn failed_step_leaves_no_partial_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE TRIGGER reject_v2 BEFORE INSERT ON migrations WHEN NEW.version = 2
            BEGIN SELECT RAISE(ABORT, 'v2 rejected'); END;",
        )
        .unwrap();

        assert!(run_migrations(&conn).is_err());
        assert_eq!(applied_versions(&conn), vec![1]);
        let indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_transaction_log_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 0);

        conn.execute_batch("DROP TRIGGER reject_v2").unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(applied_versions(&conn), vec![1, 2]);
    }
}
