//! Notifier adapters: an HTTP mail relay and a log-only sender.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use wallet_types::domain::client::mask_email;
use wallet_types::{Notification, NotificationKind, Notifier};

use crate::security::sign_payload;

/// Header carrying the hex HMAC-SHA256 of the request body.
pub const SIGNATURE_HEADER: &str = "X-Wallet-Signature";

/// Body posted to the mail relay.
#[derive(Debug, Serialize)]
pub struct RelayMessage<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub kind: NotificationKind,
    pub subject: &'a str,
    pub params: serde_json::Value,
}

/// Delivers notifications by POSTing them to a mail relay service.
///
/// The relay owns templates and SMTP; this side only signs and ships JSON.
pub struct HttpRelayNotifier {
    client: reqwest::Client,
    url: String,
    secret: String,
    from: String,
}

impl HttpRelayNotifier {
    pub fn new(url: String, secret: String, from: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            secret,
            from,
        })
    }
}

#[async_trait]
impl Notifier for HttpRelayNotifier {
    #[instrument(skip_all, fields(kind = %notification.kind(), to = %mask_email(recipient)))]
    async fn send(&self, recipient: &str, notification: &Notification) -> bool {
        let message = RelayMessage {
            from: &self.from,
            to: recipient,
            kind: notification.kind(),
            subject: notification.subject(),
            params: notification.params(),
        };

        let body = match serde_json::to_vec(&message) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode notification: {}", e);
                return false;
            }
        };
        let signature = sign_payload(&body, &self.secret);

        let result = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                debug!("Notification relayed");
                true
            }
            Ok(resp) => {
                warn!("Relay rejected notification: HTTP {}", resp.status());
                false
            }
            Err(e) => {
                warn!("Relay unreachable: {}", e);
                false
            }
        }
    }
}

/// Writes notifications to the log instead of delivering them.
///
/// Reports every message as undelivered, since nothing reaches the client's
/// mailbox; payment initiation then discloses the token in its response.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, notification: &Notification) -> bool {
        info!(
            kind = %notification.kind(),
            to = %mask_email(recipient),
            subject = notification.subject(),
            "Notification not delivered (no relay configured)"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::verify_signature;
    use axum::{Router, body::Bytes, extract::State, http::HeaderMap, http::StatusCode, routing::post};
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<(String, Bytes)>>>;

    async fn spawn_relay(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();

        async fn accept(
            State((captured, status)): State<(Captured, StatusCode)>,
            headers: HeaderMap,
            body: Bytes,
        ) -> StatusCode {
            let signature = headers
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            captured.lock().unwrap().push((signature, body));
            status
        }

        let app = Router::new()
            .route("/send", post(accept))
            .with_state((captured.clone(), status));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/send", addr), captured)
    }

    fn welcome() -> Notification {
        Notification::Welcome {
            full_name: "Ana Gomez".into(),
        }
    }

    #[tokio::test]
    async fn test_relay_posts_signed_message() {
        let (url, captured) = spawn_relay(StatusCode::ACCEPTED).await;
        let notifier = HttpRelayNotifier::new(
            url,
            "s3cret".into(),
            "Wallet <no-reply@wallet.local>".into(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert!(notifier.send("ana@example.com", &welcome()).await);

        let requests = captured.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (signature, body) = &requests[0];
        assert!(verify_signature(body, signature, "s3cret"));

        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["to"], "ana@example.com");
        assert_eq!(json["kind"], "welcome");
        assert_eq!(json["subject"], "Welcome to your wallet");
        assert_eq!(json["params"]["fullName"], "Ana Gomez");
    }

    #[tokio::test]
    async fn test_relay_rejection_is_not_delivery() {
        let (url, _captured) = spawn_relay(StatusCode::SERVICE_UNAVAILABLE).await;
        let notifier =
            HttpRelayNotifier::new(url, String::new(), "w".into(), Duration::from_secs(5)).unwrap();

        assert!(!notifier.send("ana@example.com", &welcome()).await);
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_not_delivery() {
        let notifier = HttpRelayNotifier::new(
            "http://127.0.0.1:9/send".into(),
            String::new(),
            "w".into(),
            Duration::from_millis(500),
        )
        .unwrap();

        assert!(!notifier.send("ana@example.com", &welcome()).await);
    }

    #[tokio::test]
    async fn test_log_notifier_never_claims_delivery() {
        assert!(!LogNotifier.send("ana@example.com", &welcome()).await);
    }
}
