//! Data Transfer Objects (DTOs) for requests and responses.
//!
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ClientId, SessionId, Transaction, TransactionId, TransactionStatus, TransactionType};
use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Response envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Uniform envelope wrapping every response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[schema(example = "Payment confirmed")]
    pub message: String,
    /// `SUCCESS` or a failure code such as `TOKEN_EXPIRED`
    #[schema(example = "SUCCESS")]
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub const SUCCESS: &'static str = "SUCCESS";

    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            code: Self::SUCCESS.to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: code.into(),
            data: None,
        }
    }
}

impl<T> From<&AppError> for ApiResponse<T> {
    fn from(err: &AppError) -> Self {
        ApiResponse::error(err.to_string(), err.code())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to register a new client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterClientRequest {
    /// National document number (5-20 digits)
    #[schema(example = "1111111111")]
    pub document: String,
    #[schema(example = "Ana Gomez")]
    pub full_name: String,
    #[schema(example = "ana@example.com")]
    pub email: String,
    /// Mobile number (10-15 digits)
    #[schema(example = "3001234567")]
    pub phone: String,
}

/// Public identity of a registered client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: ClientId,
    pub document: String,
    pub full_name: String,
    pub email: String,
}

/// Identifies a client by the (document, phone) pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientLookupRequest {
    #[schema(example = "1111111111")]
    pub document: String,
    #[schema(example = "3001234567")]
    pub phone: String,
}

/// Current balance of a client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub full_name: String,
    #[schema(example = 30000)]
    pub balance: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Movement DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to credit a wallet, or to start a payment from it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AmountRequest {
    #[schema(example = "1111111111")]
    pub document: String,
    #[schema(example = "3001234567")]
    pub phone: String,
    /// Whole currency units
    #[schema(example = 50000)]
    pub amount: i64,
}

pub type RechargeRequest = AmountRequest;
pub type InitiatePaymentRequest = AmountRequest;

/// Result of a recharge.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RechargeResponse {
    #[schema(example = 50000)]
    pub new_balance: i64,
}

/// Result of a payment initiation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitiatedResponse {
    pub session_id: SessionId,
    /// Masked address the token was sent to
    #[schema(example = "a***@example.com")]
    pub email: String,
    /// Only present when the token email could not be delivered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_fallback: Option<String>,
}

/// Request to confirm a pending payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    #[schema(example = "5f0c6d3e-3a43-4c6b-9a57-2b0f7b1c9e21")]
    pub session_id: String,
    #[schema(example = "482913")]
    pub token: String,
}

/// Result of a confirmed payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmedResponse {
    #[schema(example = 30000)]
    pub new_balance: i64,
    #[schema(example = 20000)]
    pub amount: i64,
}

/// One entry of a client's history. Tokens are never exposed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionSummary {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            transaction_type: tx.transaction_type,
            amount: tx.amount.amount(),
            status: tx.status,
            created_at: tx.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shapes() {
        let ok = ApiResponse::success("done", RechargeResponse { new_balance: 5 });
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "message": "done",
                "code": "SUCCESS",
                "data": {"newBalance": 5}
            })
        );

        let err: ApiResponse<()> = (&AppError::TokenExpired).into();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "TOKEN_EXPIRED");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_fallback_token_omitted_when_absent() {
        let resp = PaymentInitiatedResponse {
            session_id: SessionId::new(),
            email: "a***@x.com".into(),
            token_fallback: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("tokenFallback").is_none());
        assert!(json.get("sessionId").is_some());
    }
}
