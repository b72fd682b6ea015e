//! Transaction log model types.

use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Consistency strategy that owns a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Retry failed statements a bounded number of times, then leave them
    /// in the transaction log for reconciliation.
    BestEffortsDelivery,
    /// Try / confirm / cancel compensation.
    TryConfirmCancel,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BestEffortsDelivery => "best_efforts_delivery",
            Self::TryConfirmCancel => "try_confirm_cancel",
        }
    }

    /// Parse a stored tag. Unknown tags yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "best_efforts_delivery" => Some(Self::BestEffortsDelivery),
            "try_confirm_cancel" => Some(Self::TryConfirmCancel),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bind value for one positional statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ParameterValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl ToSql for ParameterValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(Value::Null),
            Self::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            Self::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            Self::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Self::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
        })
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Real(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Self::Blob(v) => write!(f, "<blob {} bytes>", v.len()),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for ParameterValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl<T: Into<ParameterValue>> From<Option<T>> for ParameterValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// One statement whose successful execution is not yet confirmed.
///
/// Entries are never updated; they are written before execution and
/// deleted by id once delivery is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLogEntry {
    pub id: String,
    pub transaction_id: String,
    pub transaction_type: TransactionType,
    pub data_source: String,
    pub sql: String,
    pub parameters: Vec<ParameterValue>,
    pub created_at: DateTime<Utc>,
}

impl TransactionLogEntry {
    pub fn new(
        id: impl Into<String>,
        transaction_id: impl Into<String>,
        transaction_type: TransactionType,
        data_source: impl Into<String>,
        sql: impl Into<String>,
        parameters: Vec<ParameterValue>,
    ) -> Self {
        Self {
            id: id.into(),
            transaction_id: transaction_id.into(),
            transaction_type,
            data_source: data_source.into(),
            sql: sql.into(),
            parameters,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_tags() {
        for ty in [
            TransactionType::BestEffortsDelivery,
            TransactionType::TryConfirmCancel,
        ] {
            assert_eq!(TransactionType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(
            TransactionType::parse("BEST_EFFORTS_DELIVERY"),
            Some(TransactionType::BestEffortsDelivery)
        );
        assert_eq!(TransactionType::parse("saga"), None);
    }

    #[test]
    fn parameters_serialize_tagged() {
        let params = vec![
            ParameterValue::Null,
            ParameterValue::Integer(7),
            ParameterValue::Text("seven".to_string()),
            ParameterValue::Blob(vec![0x07]),
        ];
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(
            json,
            r#"[{"type":"null"},{"type":"integer","value":7},{"type":"text","value":"seven"},{"type":"blob","value":[7]}]"#
        );
        let back: Vec<ParameterValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn parameter_conversions() {
        assert_eq!(ParameterValue::from(3i64), ParameterValue::Integer(3));
        assert_eq!(ParameterValue::from("x"), ParameterValue::Text("x".into()));
        assert_eq!(ParameterValue::from(None::<i64>), ParameterValue::Null);
        assert_eq!(ParameterValue::from(Some(2.5)), ParameterValue::Real(2.5));
    }

    #[test]
    fn parameter_display_quotes_text() {
        assert_eq!(ParameterValue::Text("it's".into()).to_string(), "'it''s'");
        assert_eq!(ParameterValue::Null.to_string(), "NULL");
    }

    #[test]
    fn parameters_bind_through_rusqlite() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let (n, s, missing): (i64, String, Option<i64>) = conn
            .query_row(
                "SELECT ?1, ?2, ?3",
                rusqlite::params![
                    ParameterValue::Integer(42),
                    ParameterValue::Text("hi".into()),
                    ParameterValue::Null
                ],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!((n, s.as_str(), missing), (42, "hi", None));
    }
}
