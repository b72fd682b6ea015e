//! Connection validation and scoped connection acquisition.

use bed_database::{
    ConnectionProvider, DatabaseError, DatabaseResult, DeliveryConnection, OwnedConnection,
    ParameterValue,
};
use tracing::{debug, error, warn};

/// Round-trip query; a live connection answers `1`.
pub const VALIDATION_QUERY: &str = "SELECT 1";

/// True only if the query succeeds and returns `1`. Query errors mean invalid.
pub fn is_valid<C: DeliveryConnection + ?Sized>(connection: &C) -> bool {
    match connection.query_scalar(VALIDATION_QUERY) {
        Ok(1) => true,
        Ok(other) => {
            debug!(result = other, "Validation query returned unexpected value");
            false
        }
        Err(err) => {
            debug!(error = %err, "Validation query failed");
            false
        }
    }
}

/// A connection held for one delivery attempt.
///
/// `Borrowed` connections go back to their pool when dropped. `Owned`
/// connections were opened for this attempt and are closed when dropped;
/// a close failure is logged and never propagated.
pub enum ConnectionLease<P: ConnectionProvider> {
    Borrowed(P::Pooled),
    Owned(Option<P::Fresh>),
}

impl<P: ConnectionProvider> ConnectionLease<P> {
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }
}

impl<P: ConnectionProvider> DeliveryConnection for ConnectionLease<P> {
    fn query_scalar(&self, sql: &str) -> DatabaseResult<i64> {
        match self {
            Self::Borrowed(conn) => conn.query_scalar(sql),
            Self::Owned(Some(conn)) => conn.query_scalar(sql),
            Self::Owned(None) => Err(released()),
        }
    }

    fn execute_update(&self, sql: &str, parameters: &[ParameterValue]) -> DatabaseResult<usize> {
        match self {
            Self::Borrowed(conn) => conn.execute_update(sql, parameters),
            Self::Owned(Some(conn)) => conn.execute_update(sql, parameters),
            Self::Owned(None) => Err(released()),
        }
    }
}

fn released() -> DatabaseError {
    DatabaseError::InvalidData("connection lease already released".to_string())
}

impl<P: ConnectionProvider> Drop for ConnectionLease<P> {
    fn drop(&mut self) {
        if let Self::Owned(slot) = self {
            if let Some(conn) = slot.take() {
                if let Err(err) = conn.close() {
                    error!(error = %err, "Closing owned connection failed");
                }
            }
        }
    }
}

/// Borrow a pooled connection for `data_source`; if it fails validation,
/// discard it and open a new connection owned by the returned lease.
pub fn acquire_connection<P: ConnectionProvider>(
    provider: &P,
    data_source: &str,
) -> DatabaseResult<ConnectionLease<P>> {
    let pooled = provider.pooled_connection(data_source)?;
    if is_valid(&pooled) {
        return Ok(ConnectionLease::Borrowed(pooled));
    }
    // r2d2 cannot evict a checked-out connection; it goes back and is
    // tested again on its next checkout.
    drop(pooled);

    warn!(data_source = %data_source, "Pooled connection invalid, opening a new one");
    let fresh = provider.new_connection(data_source)?;
    Ok(ConnectionLease::Owned(Some(fresh)))
}
