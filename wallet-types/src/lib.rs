//! # Wallet Types
//!
//! Domain types and port traits for the virtual wallet service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Client, Transaction, Notification)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Request/response payloads and the uniform response envelope
//! - `error/` - Domain, repository and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Client, ClientId, MAX_AMOUNT, Money, NewClient, Notification, NotificationKind, SessionId,
    TOKEN_TTL_MINUTES, Transaction, TransactionId, TransactionStatus, TransactionType,
};
pub use dto::*;
pub use error::{AppError, DomainError, Operation, RepoError};
pub use ports::{LedgerRepository, Notifier};
