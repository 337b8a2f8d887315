//! Error types for the wallet service.

use crate::domain::TransactionStatus;

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Amount must be greater than 0 and at most {max}, got {amount}")]
    InvalidAmount { amount: i64, max: i64 },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Balance overflow")]
    BalanceOverflow,

    #[error("Token expiry is out of range")]
    ExpiryOutOfRange,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Transaction is no longer pending (status {0})")]
    NotPending(TransactionStatus),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Wallet operation that can fail on infrastructure.
///
/// Each operation owns a distinct failure code on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Recharge,
    InitiatePayment,
    ConfirmPayment,
    CheckBalance,
    History,
}

impl Operation {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Register => "REGISTER_ERROR",
            Self::Recharge => "RECHARGE_ERROR",
            Self::InitiatePayment => "PAYMENT_INIT_ERROR",
            Self::ConfirmPayment => "PAYMENT_CONFIRM_ERROR",
            Self::CheckBalance => "BALANCE_CHECK_ERROR",
            Self::History => "HISTORY_ERROR",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Register => "register",
            Self::Recharge => "recharge",
            Self::InitiatePayment => "initiate_payment",
            Self::ConfirmPayment => "confirm_payment",
            Self::CheckBalance => "check_balance",
            Self::History => "transaction_history",
        };
        f.write_str(name)
    }
}

/// Application-level errors returned by the wallet service.
///
/// Everything except `Infrastructure` is an expected outcome of ordinary,
/// racing or duplicate requests.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Amount must be greater than 0 and at most {max}")]
    InvalidAmount { max: i64 },

    #[error("A client with that document or email already exists")]
    ClientExists,

    #[error("Client not found")]
    ClientNotFound,

    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: i64, requested: i64 },

    #[error("Payment session not found")]
    SessionNotFound,

    #[error("Transaction was already processed")]
    AlreadyProcessed,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("{operation} failed: {message}")]
    Infrastructure {
        operation: Operation,
        message: String,
    },
}

impl AppError {
    /// Wire code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidAmount { .. } => "INVALID_AMOUNT",
            AppError::ClientExists => "CLIENT_EXISTS",
            AppError::ClientNotFound => "CLIENT_NOT_FOUND",
            AppError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            AppError::SessionNotFound => "SESSION_NOT_FOUND",
            AppError::AlreadyProcessed => "TRANSACTION_ALREADY_PROCESSED",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::Infrastructure { operation, .. } => operation.error_code(),
        }
    }

    pub fn is_infrastructure(&self) -> bool {
        matches!(self, AppError::Infrastructure { .. })
    }

    /// Maps a repository failure seen while running `operation`.
    pub fn from_repo(operation: Operation, err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => match operation {
                Operation::ConfirmPayment => AppError::SessionNotFound,
                _ => AppError::ClientNotFound,
            },
            RepoError::Conflict(_) if operation == Operation::Register => AppError::ClientExists,
            RepoError::Conflict(e) | RepoError::Database(e) | RepoError::Transaction(e) => {
                AppError::Infrastructure {
                    operation,
                    message: e,
                }
            }
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidAmount { max, .. } => AppError::InvalidAmount { max },
            DomainError::InsufficientFunds {
                available,
                requested,
            } => AppError::InsufficientBalance {
                available,
                requested,
            },
            DomainError::NotPending(_) => AppError::AlreadyProcessed,
            DomainError::TokenExpired => AppError::TokenExpired,
            DomainError::ValidationError(msg) => AppError::Validation(msg),
            DomainError::NegativeAmount | DomainError::BalanceOverflow => {
                AppError::Validation(err.to_string())
            }
            DomainError::ExpiryOutOfRange => AppError::Infrastructure {
                operation: Operation::InitiatePayment,
                message: err.to_string(),
            },
        }
    }
}
