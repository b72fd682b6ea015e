//! Entry point: dispatches execution events by phase.

use crate::event::{ExecutionEvent, ExecutionPhase, TransactionConfiguration, TransactionContext};
use crate::recorder::LogRecorder;
use crate::retry::{DeliveryOutcome, RetryExecutor};
use crate::{DeliveryError, DeliveryResult};
use bed_config_and_utils::StorageType;
use bed_database::{ConnectionProvider, TransactionLogStorage};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// What the router did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// No context, or the transaction is not best-efforts delivery.
    Skipped,
    /// Write-ahead entry recorded; the caller may now execute.
    Logged,
    /// Delivery confirmed and the entry cleared.
    Confirmed,
    /// The retry loop ran.
    Retried(DeliveryOutcome),
}

/// Log recorder and retry loop bound to one log storage.
struct Route<P> {
    recorder: LogRecorder,
    executor: RetryExecutor<P>,
}

/// Drives the log-then-execute-then-confirm protocol.
///
/// Each transaction's entries go to the storage registered for
/// `context.config.storage()`. Safe to call from many threads for distinct
/// event ids. Events sharing an id must not be handled concurrently.
pub struct ExecutionEventRouter<P> {
    provider: Arc<P>,
    routes: HashMap<StorageType, Route<P>>,
}

impl<P: ConnectionProvider> ExecutionEventRouter<P> {
    /// A router with no storages yet; register them with [`Self::with_storage`].
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            routes: HashMap::new(),
        }
    }

    /// Use `storage` for transactions configured with `storage_type`,
    /// replacing any storage registered for it before.
    pub fn with_storage(
        mut self,
        storage_type: StorageType,
        storage: Arc<dyn TransactionLogStorage>,
    ) -> Self {
        let recorder = LogRecorder::new(storage);
        let route = Route {
            executor: RetryExecutor::new(Arc::clone(&self.provider), recorder.clone()),
            recorder,
        };
        self.routes.insert(storage_type, route);
        self
    }

    pub fn recorder(&self, storage_type: StorageType) -> Option<&LogRecorder> {
        self.routes.get(&storage_type).map(|route| &route.recorder)
    }

    fn route(&self, config: &TransactionConfiguration) -> DeliveryResult<&Route<P>> {
        self.routes
            .get(&config.storage())
            .ok_or(DeliveryError::StorageNotConfigured(config.storage()))
    }

    /// Handle one event under `context`.
    ///
    /// A `PRE_EXECUTE` error means nothing was logged and the statement must
    /// not run. `FAILURE` only errors when the transaction's storage is not
    /// registered: exhausted retries leave the entry.
    #[instrument(skip_all, fields(event_id = %event.id, phase = %event.phase))]
    pub fn handle(
        &self,
        event: &ExecutionEvent,
        context: Option<&TransactionContext>,
    ) -> DeliveryResult<RouteOutcome> {
        let context = match context {
            Some(context) if context.is_best_efforts_delivery() => context,
            _ => {
                debug!("Not a best-efforts delivery transaction, event ignored");
                return Ok(RouteOutcome::Skipped);
            }
        };
        let route = self.route(&context.config)?;

        match event.phase {
            ExecutionPhase::PreExecute => {
                route.recorder.add(&event.to_log_entry(context))?;
                Ok(RouteOutcome::Logged)
            }
            ExecutionPhase::Success => {
                route.recorder.remove(&event.id)?;
                Ok(RouteOutcome::Confirmed)
            }
            ExecutionPhase::Failure => Ok(RouteOutcome::Retried(
                route.executor.retry(event, &context.config),
            )),
        }
    }
}
