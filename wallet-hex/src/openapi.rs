//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use utoipa::OpenApi;
use wallet_types::domain::{ClientId, SessionId, TransactionId, TransactionStatus, TransactionType};
use wallet_types::dto::{
    AmountRequest, ApiResponse, BalanceResponse, ClientLookupRequest, ClientResponse,
    ConfirmPaymentRequest, PaymentConfirmedResponse, PaymentInitiatedResponse,
    RechargeResponse, RegisterClientRequest, TransactionSummary,
};

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Register a client with a zero balance
#[utoipa::path(
    post,
    path = "/api/clients/register",
    tag = "clients",
    request_body = RegisterClientRequest,
    responses(
        (status = 201, description = "Client registered", body = ApiResponse<ClientResponse>),
        (status = 400, description = "VALIDATION_ERROR"),
        (status = 409, description = "CLIENT_EXISTS"),
        (status = 500, description = "REGISTER_ERROR")
    )
)]
async fn register() {}

/// Credit a wallet
#[utoipa::path(
    post,
    path = "/api/clients/recharge",
    tag = "wallet",
    request_body = AmountRequest,
    responses(
        (status = 200, description = "Recharge successful", body = ApiResponse<RechargeResponse>),
        (status = 400, description = "INVALID_AMOUNT or VALIDATION_ERROR"),
        (status = 404, description = "CLIENT_NOT_FOUND"),
        (status = 500, description = "RECHARGE_ERROR")
    )
)]
async fn recharge() {}

/// Start a payment; a six-digit token is emailed to the client
#[utoipa::path(
    post,
    path = "/api/clients/payment/initiate",
    tag = "payments",
    request_body = AmountRequest,
    responses(
        (status = 200, description = "Payment pending confirmation. `tokenFallback` is present only when the email could not be sent", body = ApiResponse<PaymentInitiatedResponse>),
        (status = 400, description = "INVALID_AMOUNT or VALIDATION_ERROR"),
        (status = 404, description = "CLIENT_NOT_FOUND"),
        (status = 422, description = "INSUFFICIENT_BALANCE"),
        (status = 500, description = "PAYMENT_INIT_ERROR")
    )
)]
async fn initiate_payment() {}

/// Confirm a pending payment with its token
#[utoipa::path(
    post,
    path = "/api/clients/payment/confirm",
    tag = "payments",
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment completed", body = ApiResponse<PaymentConfirmedResponse>),
        (status = 400, description = "INVALID_TOKEN or VALIDATION_ERROR"),
        (status = 404, description = "SESSION_NOT_FOUND"),
        (status = 409, description = "TRANSACTION_ALREADY_PROCESSED"),
        (status = 410, description = "TOKEN_EXPIRED"),
        (status = 422, description = "INSUFFICIENT_BALANCE"),
        (status = 500, description = "PAYMENT_CONFIRM_ERROR")
    )
)]
async fn confirm_payment() {}

/// Query a wallet balance
#[utoipa::path(
    post,
    path = "/api/clients/balance",
    tag = "wallet",
    request_body = ClientLookupRequest,
    responses(
        (status = 200, description = "Balance retrieved", body = ApiResponse<BalanceResponse>),
        (status = 404, description = "CLIENT_NOT_FOUND"),
        (status = 500, description = "BALANCE_CHECK_ERROR")
    )
)]
async fn check_balance() {}

/// List a wallet's transactions, newest first
#[utoipa::path(
    post,
    path = "/api/clients/transactions",
    tag = "wallet",
    request_body = ClientLookupRequest,
    responses(
        (status = 200, description = "Transactions retrieved", body = ApiResponse<Vec<TransactionSummary>>),
        (status = 404, description = "CLIENT_NOT_FOUND"),
        (status = 500, description = "HISTORY_ERROR")
    )
)]
async fn transaction_history() {}

/// OpenAPI documentation for the Wallet API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Virtual Wallet API",
        version = "1.0.0",
        description = "Client registration, wallet recharges and token-confirmed payments.\n\nEvery response is wrapped in an envelope:\n\n```\n{ \"success\": true, \"message\": \"...\", \"code\": \"SUCCESS\", \"data\": { ... } }\n```\n\nPayments are two-step: `initiate` emails a six-digit token valid for ten minutes, and `confirm` debits the wallet once the token is presented.",
        license(name = "MIT"),
    ),
    paths(
        health,
        register,
        recharge,
        initiate_payment,
        confirm_payment,
        check_balance,
        transaction_history,
    ),
    components(
        schemas(
            RegisterClientRequest,
            ClientResponse,
            ClientLookupRequest,
            BalanceResponse,
            AmountRequest,
            RechargeResponse,
            PaymentInitiatedResponse,
            ConfirmPaymentRequest,
            PaymentConfirmedResponse,
            TransactionSummary,
            TransactionType,
            TransactionStatus,
            ClientId,
            SessionId,
            TransactionId,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "clients", description = "Client registration"),
        (name = "wallet", description = "Recharges, balance and history"),
        (name = "payments", description = "Token-confirmed payments"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for path in [
            "/health",
            "/api/clients/register",
            "/api/clients/recharge",
            "/api/clients/payment/initiate",
            "/api/clients/payment/confirm",
            "/api/clients/balance",
            "/api/clients/transactions",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == path), "missing {}", path);
        }
    }
}
