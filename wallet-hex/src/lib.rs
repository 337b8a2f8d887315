//! # Wallet Hex
//!
//! Application service layer and HTTP adapter for the wallet service.
//!
//! ## Architecture
//!
//! - `service` - Application service (registration, recharges, payments)
//! - `notify` - Background notification queue
//! - `reaper` - Periodic expiry of abandoned payments
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: LedgerRepository`, allowing
//! different repository implementations to be injected.

pub mod inbound;
pub mod notify;
pub mod openapi;
pub mod reaper;
pub mod service;
pub mod token;


pub use notify::NotificationQueue;
pub use reaper::ExpiredPaymentReaper;
pub use service::{WalletPolicy, WalletService};
