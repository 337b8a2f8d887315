//! Domain models for the wallet service.

pub mod client;
pub mod money;
pub mod notification;
pub mod transaction;

pub use client::{Client, ClientId, NewClient};
pub use money::{MAX_AMOUNT, Money};
pub use notification::{Notification, NotificationKind};
pub use transaction::{
    SessionId, TOKEN_TTL_MINUTES, Transaction, TransactionId, TransactionStatus, TransactionType,
};
