//! Fire-and-forget notification queue.
//!
//! Financial operations enqueue their follow-up messages and return at once;
//! a background worker hands them to the `Notifier`.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, instrument, warn};

use wallet_types::domain::client::mask_email;
use wallet_types::{Notification, Notifier};

/// Default number of messages buffered before new ones are dropped.
pub const QUEUE_CAPACITY: usize = 1024;

/// A notification addressed to a recipient.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub recipient: String,
    pub notification: Notification,
}

/// Sending half of the queue. Cheap to clone.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<Outbound>,
}

impl NotificationQueue {
    /// Creates a queue and the worker that drains it.
    pub fn new(notifier: Arc<dyn Notifier>, capacity: usize) -> (Self, NotificationWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, NotificationWorker { rx, notifier })
    }

    /// Creates a queue and spawns its worker on the current Tokio runtime.
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> Self {
        let (queue, worker) = Self::new(notifier, capacity);
        tokio::spawn(worker.run());
        queue
    }

    /// Queues a notification without waiting. A full or closed queue drops it.
    pub fn enqueue(&self, recipient: &str, notification: Notification) {
        let kind = notification.kind();
        let message = Outbound {
            recipient: recipient.to_string(),
            notification,
        };

        match self.tx.try_send(message) {
            Ok(()) => debug!(%kind, "Notification queued"),
            Err(TrySendError::Full(_)) => {
                warn!(%kind, to = %mask_email(recipient), "Notification queue full, dropping message")
            }
            Err(TrySendError::Closed(_)) => {
                warn!(%kind, to = %mask_email(recipient), "Notification worker stopped, dropping message")
            }
        }
    }
}

/// Drains the queue into the notifier until every sender is dropped.
pub struct NotificationWorker {
    rx: mpsc::Receiver<Outbound>,
    notifier: Arc<dyn Notifier>,
}

impl NotificationWorker {
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!("Notification worker started");
        while let Some(message) = self.rx.recv().await {
            let delivered = self
                .notifier
                .send(&message.recipient, &message.notification)
                .await;

            if !delivered {
                warn!(
                    kind = %message.notification.kind(),
                    to = %mask_email(&message.recipient),
                    "Notification was not delivered"
                );
            }
        }
        info!("Notification worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service_tests::tests::RecordingNotifier;

    fn welcome(name: &str) -> Notification {
        Notification::Welcome {
            full_name: name.into(),
        }
    }

    #[tokio::test]
    async fn test_worker_delivers_in_order() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, worker) = NotificationQueue::new(notifier.clone(), 8);

        queue.enqueue("a@x.com", welcome("Ana"));
        queue.enqueue("b@x.com", welcome("Bea"));
        drop(queue);
        worker.run().await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "a@x.com");
        assert_eq!(sent[1].1, welcome("Bea"));
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, worker) = NotificationQueue::new(notifier.clone(), 1);

        queue.enqueue("a@x.com", welcome("Ana"));
        queue.enqueue("b@x.com", welcome("Bea"));
        drop(queue);
        worker.run().await;

        assert_eq!(notifier.sent().len(), 1);
    }
}
