//! Delivery error types.

use bed_config_and_utils::StorageType;
use bed_database::DatabaseError;
use thiserror::Error;

/// Errors surfaced to the caller of the event router.
///
/// Statement failures during retry are not represented here: they are
/// retried, logged, and finally left to reconciliation.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Execution phase name the router does not know. A caller bug.
    #[error("Unsupported execution phase: {0}")]
    UnsupportedPhase(String),

    /// The transaction log could not be written or cleared.
    #[error("Transaction log error: {0}")]
    Storage(#[from] DatabaseError),

    /// The transaction asks for a log storage the router was not given.
    #[error("No transaction log storage registered for '{}'", .0.as_str())]
    StorageNotConfigured(StorageType),

    /// Transaction configuration the retry loop cannot run with.
    #[error("Invalid transaction configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type alias using DeliveryError.
pub type DeliveryResult<T> = Result<T, DeliveryError>;
