//! Connection traits the delivery retry loop works through.
//!
//! A [`ConnectionProvider`] hands out two kinds of connection for a named
//! data source: a pooled one, which belongs to the pool and is returned to it
//! when dropped, and a freshly opened one, which belongs to the caller and
//! must be closed with [`OwnedConnection::close`].

use crate::{DatabaseResult, ParameterValue};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::warn;

/// Statement execution surface of a data-source connection.
pub trait DeliveryConnection {
    /// Run a query returning a single integer scalar.
    fn query_scalar(&self, sql: &str) -> DatabaseResult<i64>;

    /// Prepare `sql`, bind `parameters` to positional placeholders
    /// (1-based, in list order), execute it and release the statement.
    /// Returns the number of affected rows.
    fn execute_update(&self, sql: &str, parameters: &[ParameterValue]) -> DatabaseResult<usize>;
}

/// A connection opened for one caller, who must close it.
pub trait OwnedConnection: DeliveryConnection {
    fn close(self) -> DatabaseResult<()>;
}

/// Source of connections keyed by data-source name.
pub trait ConnectionProvider: Send + Sync {
    type Pooled: DeliveryConnection;
    type Fresh: OwnedConnection;

    /// Borrow a connection from the data source's pool.
    fn pooled_connection(&self, data_source: &str) -> DatabaseResult<Self::Pooled>;

    /// Open a brand-new connection outside the pool.
    fn new_connection(&self, data_source: &str) -> DatabaseResult<Self::Fresh>;
}

impl DeliveryConnection for Connection {
    fn query_scalar(&self, sql: &str) -> DatabaseResult<i64> {
        Ok(self.query_row(sql, [], |row| row.get(0))?)
    }

    fn execute_update(&self, sql: &str, parameters: &[ParameterValue]) -> DatabaseResult<usize> {
        let mut stmt = self.prepare(sql)?;
        let outcome = bind_and_execute(&mut stmt, parameters);
        // Finalize errors never replace the execution outcome.
        if let Err(err) = stmt.finalize() {
            warn!(error = %err, "Prepared statement release failed");
        }
        outcome
    }
}

fn bind_and_execute(
    stmt: &mut rusqlite::Statement<'_>,
    parameters: &[ParameterValue],
) -> DatabaseResult<usize> {
    // Unbound placeholders would silently execute as NULL.
    let expected = stmt.parameter_count();
    if parameters.len() != expected {
        return Err(rusqlite::Error::InvalidParameterCount(parameters.len(), expected).into());
    }
    for (index, value) in parameters.iter().enumerate() {
        stmt.raw_bind_parameter(index + 1, value)?;
    }
    Ok(stmt.raw_execute()?)
}

impl OwnedConnection for Connection {
    fn close(self) -> DatabaseResult<()> {
        Connection::close(self).map_err(|(_, err)| err.into())
    }
}

impl DeliveryConnection for PooledConnection<SqliteConnectionManager> {
    fn query_scalar(&self, sql: &str) -> DatabaseResult<i64> {
        (**self).query_scalar(sql)
    }

    fn execute_update(&self, sql: &str, parameters: &[ParameterValue]) -> DatabaseResult<usize> {
        (**self).execute_update(sql, parameters)
    }
}
