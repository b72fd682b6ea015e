//! Run one statement through the full delivery protocol.

use super::Environment;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use bed_database::{ConnectionProvider, DeliveryConnection, ParameterValue, SqliteDataSources};
use best_efforts_delivery::{
    DeliveryOutcome, ExecutionEvent, ExecutionEventRouter, ExecutionPhase, RouteOutcome,
    TransactionConfiguration, TransactionContext,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Parse a `--param` value.
///
/// `null`, `int:<n>`, `real:<x>` and `text:<s>` are explicit. Anything else
/// is an integer if it parses as one, then a real, then text.
pub fn parse_param(raw: &str) -> Result<ParameterValue, String> {
    if raw.eq_ignore_ascii_case("null") {
        return Ok(ParameterValue::Null);
    }
    if let Some(value) = raw.strip_prefix("int:") {
        return value
            .parse::<i64>()
            .map(ParameterValue::Integer)
            .map_err(|e| format!("invalid integer {:?}: {}", value, e));
    }
    if let Some(value) = raw.strip_prefix("real:") {
        return value
            .parse::<f64>()
            .map(ParameterValue::Real)
            .map_err(|e| format!("invalid real {:?}: {}", value, e));
    }
    if let Some(value) = raw.strip_prefix("text:") {
        return Ok(ParameterValue::Text(value.to_string()));
    }
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(ParameterValue::Integer(value));
    }
    if let Ok(value) = raw.parse::<f64>() {
        return Ok(ParameterValue::Real(value));
    }
    Ok(ParameterValue::Text(raw.to_string()))
}

/// Statement to run.
#[derive(Debug, Clone)]
pub struct ExecArgs {
    pub data_source: String,
    pub sql: String,
    pub parameters: Vec<ParameterValue>,
    /// Event id; generated when absent.
    pub id: Option<String>,
    /// Transaction id; generated when absent.
    pub transaction_id: Option<String>,
}

/// How the statement ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecStatus {
    /// The first execution succeeded.
    Executed,
    /// The first execution failed and a retry succeeded.
    DeliveredOnRetry,
    /// Every attempt failed; the entry waits for reconciliation.
    Pending,
}

impl ExecStatus {
    fn label(&self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::DeliveredOnRetry => "delivered on retry",
            Self::Pending => "pending reconciliation",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecReport {
    pub event_id: String,
    pub transaction_id: String,
    pub data_source: String,
    pub status: ExecStatus,
    /// Retry attempts made after the first execution.
    pub retry_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_error: Option<String>,
}

impl fmt::Display for ExecReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", output::row("Event", &self.event_id))?;
        writeln!(f, "{}", output::row("Transaction", &self.transaction_id))?;
        writeln!(f, "{}", output::row("Data source", &self.data_source))?;
        write!(f, "{}", output::row("Status", self.status.label()))?;
        if let Some(err) = &self.first_error {
            writeln!(f)?;
            writeln!(f, "{}", output::row("First error", err))?;
            write!(f, "{}", output::row("Retry attempts", self.retry_attempts))?;
        }
        Ok(())
    }
}

/// Log, execute, then confirm or retry `args` against its data source.
pub fn run_exec(env: &Environment, args: ExecArgs) -> Result<ExecReport> {
    let sources = Arc::new(SqliteDataSources::from_config(&env.config)?);
    if !sources.contains(&args.data_source) {
        bail!(
            "unknown data source '{}' (configured: {})",
            args.data_source,
            sources.names().join(", ")
        );
    }

    let router = ExecutionEventRouter::new(Arc::clone(&sources))
        .with_storage(env.config.storage, env.log_storage()?);
    let tx_config = TransactionConfiguration::from_config(&env.config)?;
    let transaction_id = args
        .transaction_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let context = TransactionContext::best_efforts(transaction_id.clone(), tx_config);
    let event = ExecutionEvent::new(
        args.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        ExecutionPhase::PreExecute,
        args.data_source,
        args.sql,
        args.parameters,
    );

    router.handle(&event, Some(&context))?;

    let first_attempt = sources
        .pooled_connection(&event.data_source)
        .and_then(|conn| conn.execute_update(&event.sql, &event.parameters));

    let mut report = ExecReport {
        event_id: event.id.clone(),
        transaction_id,
        data_source: event.data_source.clone(),
        status: ExecStatus::Executed,
        retry_attempts: 0,
        first_error: None,
    };

    match first_attempt {
        Ok(affected) => {
            info!(event_id = %event.id, affected, "Statement executed");
            router.handle(&event.with_phase(ExecutionPhase::Success), Some(&context))?;
        }
        Err(err) => {
            warn!(event_id = %event.id, error = %err, "Statement failed, retrying");
            report.first_error = Some(err.to_string());
            let outcome = router.handle(&event.with_phase(ExecutionPhase::Failure), Some(&context))?;
            if let RouteOutcome::Retried(delivery) = outcome {
                report.retry_attempts = delivery.attempts();
                report.status = match delivery {
                    DeliveryOutcome::Delivered { .. } => ExecStatus::DeliveredOnRetry,
                    DeliveryOutcome::Exhausted { .. } => ExecStatus::Pending,
                };
            }
        }
    }

    Ok(report)
}

pub fn exec(env: &Environment, args: ExecArgs, format: &OutputFormat) -> Result<()> {
    let report = run_exec(env, args)?;
    output::print(&report, format)
}
