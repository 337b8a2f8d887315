//! # Wallet Client SDK
//!
//! A typed Rust client for the Wallet API.
//!
//! Every call unwraps the response envelope: a successful envelope yields its
//! `data`, a failed one becomes [`ClientError::Api`] carrying the wire code.

use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use wallet_types::{
    AmountRequest, ApiResponse, BalanceResponse, ClientLookupRequest, ClientResponse,
    ConfirmPaymentRequest, PaymentConfirmedResponse, PaymentInitiatedResponse, RechargeResponse,
    RegisterClientRequest, SessionId, TransactionSummary,
};

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Wire code of an API failure, e.g. `TOKEN_EXPIRED`.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Wallet API client.
#[derive(Debug, Clone)]
pub struct WalletClient {
    base_url: String,
    http: Client,
}

impl WalletClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Registers a new client.
    pub async fn register(
        &self,
        document: &str,
        full_name: &str,
        email: &str,
        phone: &str,
    ) -> Result<ClientResponse, ClientError> {
        let req = RegisterClientRequest {
            document: document.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        };
        self.post("/api/clients/register", &req).await
    }

    /// Credits a wallet.
    pub async fn recharge(
        &self,
        document: &str,
        phone: &str,
        amount: i64,
    ) -> Result<RechargeResponse, ClientError> {
        self.post("/api/clients/recharge", &amount_request(document, phone, amount))
            .await
    }

    /// Starts a payment. The token goes to the client's email, or comes back
    /// in `token_fallback` when it could not be sent.
    pub async fn initiate_payment(
        &self,
        document: &str,
        phone: &str,
        amount: i64,
    ) -> Result<PaymentInitiatedResponse, ClientError> {
        self.post(
            "/api/clients/payment/initiate",
            &amount_request(document, phone, amount),
        )
        .await
    }

    /// Confirms a pending payment.
    pub async fn confirm_payment(
        &self,
        session_id: SessionId,
        token: &str,
    ) -> Result<PaymentConfirmedResponse, ClientError> {
        let req = ConfirmPaymentRequest {
            session_id: session_id.to_string(),
            token: token.to_string(),
        };
        self.post("/api/clients/payment/confirm", &req).await
    }

    /// Queries a wallet balance.
    pub async fn balance(&self, document: &str, phone: &str) -> Result<BalanceResponse, ClientError> {
        self.post("/api/clients/balance", &lookup(document, phone))
            .await
    }

    /// Lists a wallet's transactions, newest first.
    pub async fn transactions(
        &self,
        document: &str,
        phone: &str,
    ) -> Result<Vec<TransactionSummary>, ClientError> {
        self.post("/api/clients/transactions", &lookup(document, phone))
            .await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        unwrap_envelope(status, &body)
    }
}

fn amount_request(document: &str, phone: &str, amount: i64) -> AmountRequest {
    AmountRequest {
        document: document.to_string(),
        phone: phone.to_string(),
        amount,
    }
}

fn lookup(document: &str, phone: &str) -> ClientLookupRequest {
    ClientLookupRequest {
        document: document.to_string(),
        phone: phone.to_string(),
    }
}

fn unwrap_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ClientError> {
    let envelope: ApiResponse<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        // Not an envelope, e.g. a proxy error page.
        Err(_) if !(200..300).contains(&status) => {
            return Err(ClientError::Api {
                status,
                code: "HTTP_ERROR".to_string(),
                message: body.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    match envelope {
        ApiResponse {
            success: true,
            data: Some(data),
            ..
        } => Ok(data),
        ApiResponse { code, message, .. } => Err(ClientError::Api {
            status,
            code,
            message,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = WalletClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = WalletClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_unwrap_success_envelope() {
        let body = r#"{"success":true,"message":"ok","code":"SUCCESS","data":{"newBalance":500}}"#;

        let data: RechargeResponse = unwrap_envelope(200, body).unwrap();

        assert_eq!(data.new_balance, 500);
    }

    #[test]
    fn test_unwrap_error_envelope() {
        let body = r#"{"success":false,"message":"Token has expired","code":"TOKEN_EXPIRED"}"#;

        let err = unwrap_envelope::<PaymentConfirmedResponse>(410, body).unwrap_err();

        assert_eq!(err.code(), Some("TOKEN_EXPIRED"));
        assert!(matches!(err, ClientError::Api { status: 410, .. }));
    }

    #[test]
    fn test_unwrap_non_envelope_error() {
        let err = unwrap_envelope::<BalanceResponse>(502, "Bad Gateway").unwrap_err();

        assert_eq!(err.code(), Some("HTTP_ERROR"));
    }

    #[tokio::test]
    async fn test_round_trip_against_stub_server() {
        use axum::{Json, Router, routing::post};

        let app = Router::new().route(
            "/api/clients/balance",
            post(|Json(req): Json<ClientLookupRequest>| async move {
                Json(ApiResponse::success(
                    "Balance retrieved",
                    BalanceResponse {
                        full_name: format!("holder of {}", req.document),
                        balance: 30_000,
                    },
                ))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client = WalletClient::new(format!("http://{}", addr));
        let balance = client.balance("1111111111", "3001234567").await.unwrap();

        assert_eq!(balance.balance, 30_000);
        assert_eq!(balance.full_name, "holder of 1111111111");
    }
}
