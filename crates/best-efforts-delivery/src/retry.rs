//! Bounded synchronous redelivery of a failed statement.

use crate::event::{ExecutionEvent, TransactionConfiguration};
use crate::recorder::LogRecorder;
use crate::validator::acquire_connection;
use bed_database::{ConnectionProvider, DatabaseResult, DeliveryConnection};
use std::sync::Arc;
use tracing::{error, info, warn};

/// How a retry loop ended. Neither variant is an error for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The statement executed on attempt `attempts`.
    Delivered { attempts: u32 },
    /// Every attempt failed; the log entry stays for reconciliation.
    Exhausted { attempts: u32 },
}

impl DeliveryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts } | Self::Exhausted { attempts } => *attempts,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Replays failed statements against their data source.
pub struct RetryExecutor<P> {
    provider: Arc<P>,
    recorder: LogRecorder,
}

impl<P: ConnectionProvider> RetryExecutor<P> {
    pub fn new(provider: Arc<P>, recorder: LogRecorder) -> Self {
        Self { provider, recorder }
    }

    /// Make up to `config.max_delivery_retries()` attempts, stopping at the
    /// first success, which clears the log entry. Blocks for the whole loop.
    pub fn retry(&self, event: &ExecutionEvent, config: &TransactionConfiguration) -> DeliveryOutcome {
        let max_attempts = config.max_delivery_retries();

        for attempt in 1..=max_attempts {
            match self.attempt(event) {
                Ok(affected) => {
                    info!(
                        event_id = %event.id,
                        data_source = %event.data_source,
                        attempt,
                        affected,
                        "Statement delivered on retry"
                    );
                    self.confirm(event);
                    return DeliveryOutcome::Delivered { attempts: attempt };
                }
                Err(err) => {
                    error!(
                        event_id = %event.id,
                        data_source = %event.data_source,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Delivery attempt failed"
                    );
                }
            }
        }

        warn!(
            event_id = %event.id,
            data_source = %event.data_source,
            max_attempts,
            "Delivery retries exhausted, entry left for reconciliation"
        );
        DeliveryOutcome::Exhausted {
            attempts: max_attempts,
        }
    }

    /// One acquisition and execution. The lease is released before returning.
    fn attempt(&self, event: &ExecutionEvent) -> DatabaseResult<usize> {
        let lease = acquire_connection(self.provider.as_ref(), &event.data_source)?;
        lease.execute_update(&event.sql, &event.parameters)
    }

    /// The statement already ran; a surviving entry only means it may be
    /// delivered again by reconciliation.
    fn confirm(&self, event: &ExecutionEvent) {
        if let Err(err) = self.recorder.remove(&event.id) {
            error!(
                event_id = %event.id,
                error = %err,
                "Delivered statement could not be cleared from the transaction log"
            );
        }
    }
}
