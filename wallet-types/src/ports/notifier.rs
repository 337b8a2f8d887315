//! Outbound notification port.

use crate::domain::Notification;

/// Best-effort sender of client notifications.
///
/// Delivery failure is reported through the return value only; a sender
/// must never panic or surface an error to the caller.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Sends `notification` to `recipient`. Returns whether it was delivered.
    async fn send(&self, recipient: &str, notification: &Notification) -> bool;
}
