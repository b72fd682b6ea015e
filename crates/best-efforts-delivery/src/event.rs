//! Execution events and the per-call transaction context.

use crate::{DeliveryError, DeliveryResult};
use bed_config_and_utils::{Config, StorageType};
use bed_database::{ParameterValue, TransactionLogEntry, TransactionType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Point in a statement's execution an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum ExecutionPhase {
    /// About to execute; the statement must be logged first.
    PreExecute,
    /// Executed successfully.
    Success,
    /// Execution failed.
    Failure,
}

impl ExecutionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreExecute => "PRE_EXECUTE",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionPhase {
    type Err = DeliveryError;

    /// Accepts the canonical names and the executor's
    /// `BEFORE_EXECUTE` / `EXECUTE_SUCCESS` / `EXECUTE_FAILURE` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRE_EXECUTE" | "BEFORE_EXECUTE" => Ok(Self::PreExecute),
            "SUCCESS" | "EXECUTE_SUCCESS" => Ok(Self::Success),
            "FAILURE" | "EXECUTE_FAILURE" => Ok(Self::Failure),
            _ => Err(DeliveryError::UnsupportedPhase(s.to_string())),
        }
    }
}

impl TryFrom<String> for ExecutionPhase {
    type Error = DeliveryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One report about one statement execution on one data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// Unique per statement execution; shared by all phases of it.
    pub id: String,
    pub phase: ExecutionPhase,
    pub data_source: String,
    pub sql: String,
    #[serde(default)]
    pub parameters: Vec<ParameterValue>,
}

impl ExecutionEvent {
    pub fn new(
        id: impl Into<String>,
        phase: ExecutionPhase,
        data_source: impl Into<String>,
        sql: impl Into<String>,
        parameters: Vec<ParameterValue>,
    ) -> Self {
        Self {
            id: id.into(),
            phase,
            data_source: data_source.into(),
            sql: sql.into(),
            parameters,
        }
    }

    /// The same statement reported at another phase.
    pub fn with_phase(&self, phase: ExecutionPhase) -> Self {
        Self {
            phase,
            ..self.clone()
        }
    }

    /// Write-ahead record for this statement under `context`.
    pub fn to_log_entry(&self, context: &TransactionContext) -> TransactionLogEntry {
        TransactionLogEntry::new(
            self.id.clone(),
            context.transaction_id.clone(),
            context.transaction_type,
            self.data_source.clone(),
            self.sql.clone(),
            self.parameters.clone(),
        )
    }
}

/// Transaction-scoped delivery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionConfiguration {
    max_delivery_retries: u32,
    storage: StorageType,
}

impl TransactionConfiguration {
    /// `max_delivery_retries` must be at least 1.
    pub fn new(max_delivery_retries: u32, storage: StorageType) -> DeliveryResult<Self> {
        if max_delivery_retries == 0 {
            return Err(DeliveryError::InvalidConfiguration(
                "max_delivery_retries must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_delivery_retries,
            storage,
        })
    }

    pub fn from_config(config: &Config) -> DeliveryResult<Self> {
        Self::new(config.max_delivery_retries, config.storage)
    }

    /// Attempts the retry loop makes after the original failure.
    pub fn max_delivery_retries(&self) -> u32 {
        self.max_delivery_retries
    }

    pub fn storage(&self) -> StorageType {
        self.storage
    }
}

/// The transaction an event belongs to, passed explicitly on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionContext {
    pub transaction_id: String,
    pub transaction_type: TransactionType,
    pub config: TransactionConfiguration,
}

impl TransactionContext {
    pub fn new(
        transaction_id: impl Into<String>,
        transaction_type: TransactionType,
        config: TransactionConfiguration,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            transaction_type,
            config,
        }
    }

    /// Context for a best-efforts delivery transaction.
    pub fn best_efforts(transaction_id: impl Into<String>, config: TransactionConfiguration) -> Self {
        Self::new(transaction_id, TransactionType::BestEffortsDelivery, config)
    }

    pub fn is_best_efforts_delivery(&self) -> bool {
        self.transaction_type == TransactionType::BestEffortsDelivery
    }
}
