//! Parsing and error helpers shared by the SQLite and PostgreSQL adapters.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use wallet_types::{RepoError, TransactionStatus, TransactionType};

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_transaction_type(s: &str) -> Result<TransactionType, RepoError> {
    match s {
        "RECHARGE" => Ok(TransactionType::Recharge),
        "PAYMENT" => Ok(TransactionType::Payment),
        _ => Err(RepoError::Database(format!(
            "Unknown transaction type: {}",
            s
        ))),
    }
}

pub fn parse_transaction_status(s: &str) -> Result<TransactionStatus, RepoError> {
    match s {
        "PENDING" => Ok(TransactionStatus::Pending),
        "COMPLETED" => Ok(TransactionStatus::Completed),
        "FAILED" => Ok(TransactionStatus::Failed),
        _ => Err(RepoError::Database(format!(
            "Unknown transaction status: {}",
            s
        ))),
    }
}

#[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
pub fn parse_uuid(s: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

#[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

/// Fixed-width RFC 3339 text, so lexical order equals time order.
#[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ─────────────────────────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────────────────────────

/// Maps a failed write, turning unique-index violations into `Conflict`.
pub fn map_write_error(err: sqlx::Error) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(db.message().to_string())
        }
        _ => RepoError::Database(err.to_string()),
    }
}

pub fn map_db_error(err: sqlx::Error) -> RepoError {
    RepoError::Database(err.to_string())
}

pub fn map_tx_error(err: sqlx::Error) -> RepoError {
    RepoError::Transaction(err.to_string())
}
