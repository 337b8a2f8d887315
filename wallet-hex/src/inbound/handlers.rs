//! HTTP request handlers.
//!
//! Every response, success or failure, is an `ApiResponse` envelope.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use wallet_types::{
    ApiResponse, AppError, ClientLookupRequest, ConfirmPaymentRequest, InitiatePaymentRequest,
    LedgerRepository, RechargeRequest, RegisterClientRequest,
};

use crate::WalletService;

/// Application state shared across handlers.
pub struct AppState<R: LedgerRepository> {
    pub service: Arc<WalletService<R>>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(AppError::Validation(rejection.body_text()))
    }
}

/// HTTP status for each failure.
pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::Validation(_) | AppError::InvalidAmount { .. } | AppError::InvalidToken => {
            StatusCode::BAD_REQUEST
        }
        AppError::ClientNotFound | AppError::SessionNotFound => StatusCode::NOT_FOUND,
        AppError::ClientExists | AppError::AlreadyProcessed => StatusCode::CONFLICT,
        AppError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::TokenExpired => StatusCode::GONE,
        AppError::Infrastructure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body: ApiResponse<()> = (&self.0).into();
        (status_for(&self.0), Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Register a new client.
#[tracing::instrument(skip_all)]
pub async fn register<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    payload: Result<Json<RegisterClientRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let client = state.service.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Client registered successfully", client)),
    ))
}

/// Credit a wallet.
#[tracing::instrument(skip_all)]
pub async fn recharge<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    payload: Result<Json<RechargeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let result = state.service.recharge(req).await?;
    Ok(Json(ApiResponse::success("Recharge successful", result)))
}

/// Start a payment and send its confirmation token.
#[tracing::instrument(skip_all)]
pub async fn initiate_payment<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    payload: Result<Json<InitiatePaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let result = state.service.initiate_payment(req).await?;
    let message = if result.token_fallback.is_some() {
        "Payment initiated; the token could not be emailed and is included in this response"
    } else {
        "Payment initiated; a confirmation token was sent to your email"
    };
    Ok(Json(ApiResponse::success(message, result)))
}

/// Confirm a pending payment with its token.
#[tracing::instrument(skip_all)]
pub async fn confirm_payment<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    payload: Result<Json<ConfirmPaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let result = state.service.confirm_payment(req).await?;
    Ok(Json(ApiResponse::success(
        "Payment confirmed successfully",
        result,
    )))
}

/// Query a wallet balance.
#[tracing::instrument(skip_all)]
pub async fn check_balance<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    payload: Result<Json<ClientLookupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let result = state.service.check_balance(req).await?;
    Ok(Json(ApiResponse::success("Balance retrieved", result)))
}

/// List a wallet's transactions.
#[tracing::instrument(skip_all)]
pub async fn transaction_history<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    payload: Result<Json<ClientLookupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let result = state.service.transaction_history(req).await?;
    Ok(Json(ApiResponse::success("Transactions retrieved", result)))
}
