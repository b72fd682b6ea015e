//! # Best-Efforts Delivery
//!
//! Guarantees every statement of a sharded transaction is eventually applied
//! to its data source, or left durably logged for reconciliation.
//!
//! ## Protocol
//!
//! - **Log before execute** - `PRE_EXECUTE` writes the entry; a storage error
//!   means the statement must not run
//! - **Clear on confirmed success** - `SUCCESS`, or a successful retry, removes it
//! - **Never clear on failure** - exhausted retries leave the entry in place
//!
//! ## Architecture
//!
//! ```text
//! ExecutionEvent ──► ExecutionEventRouter ── storage by context.config.storage()
//!                      ├─ PRE_EXECUTE ─► LogRecorder::add
//!                      ├─ SUCCESS ─────► LogRecorder::remove
//!                      └─ FAILURE ─────► RetryExecutor
//!                                          └─ per attempt:
//!                                             acquire_connection (validate, replace)
//!                                             execute_update
//!                                             LogRecorder::remove on success
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use bed_config_and_utils::StorageType;
//! use bed_database::{MemoryTransactionLogStorage, SqliteDataSources, TransactionLogStorage};
//! use best_efforts_delivery::{
//!     ExecutionEvent, ExecutionEventRouter, ExecutionPhase, RouteOutcome,
//!     TransactionConfiguration, TransactionContext,
//! };
//!
//! let storage = Arc::new(MemoryTransactionLogStorage::new());
//! let router = ExecutionEventRouter::new(Arc::new(SqliteDataSources::new()))
//!     .with_storage(StorageType::Memory, storage.clone());
//!
//! let config = TransactionConfiguration::new(3, StorageType::Memory).unwrap();
//! let context = TransactionContext::best_efforts("tx-1", config);
//! let event = ExecutionEvent::new(
//!     "7",
//!     ExecutionPhase::PreExecute,
//!     "ds_0",
//!     "UPDATE t_order SET status = ? WHERE order_id = ?",
//!     vec!["PAID".into(), 1000i64.into()],
//! );
//!
//! assert_eq!(router.handle(&event, Some(&context)).unwrap(), RouteOutcome::Logged);
//! assert_eq!(storage.count().unwrap(), 1);
//!
//! // ... the caller executes the statement ...
//!
//! let confirmed = event.with_phase(ExecutionPhase::Success);
//! assert_eq!(router.handle(&confirmed, Some(&context)).unwrap(), RouteOutcome::Confirmed);
//! assert_eq!(storage.count().unwrap(), 0);
//!
//! // Outside a best-efforts transaction nothing happens.
//! assert_eq!(router.handle(&event, None).unwrap(), RouteOutcome::Skipped);
//! ```

mod error;
mod event;
mod recorder;
mod retry;
mod router;
pub mod validator;

pub use error::{DeliveryError, DeliveryResult};
pub use event::{ExecutionEvent, ExecutionPhase, TransactionConfiguration, TransactionContext};
pub use recorder::LogRecorder;
pub use retry::{DeliveryOutcome, RetryExecutor};
pub use router::{ExecutionEventRouter, RouteOutcome};
pub use validator::{acquire_connection, is_valid, ConnectionLease, VALIDATION_QUERY};

#[cfg(test)]
mod tests;
