//! End-to-end tests of the HTTP surface over an in-memory SQLite store.
//!
//! The log-only notifier never delivers, so every initiation carries the
//! fallback token, which is what these tests confirm with.
//!
//! This test requires the `sqlite` feature flag.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wallet_hex::{WalletPolicy, WalletService, inbound::HttpServer};
use wallet_repo::{LogNotifier, SqliteRepo};

async fn create_app() -> Router {
    let repo = SqliteRepo::new("sqlite::memory:").await.unwrap();
    let service = WalletService::new(repo, Arc::new(LogNotifier), WalletPolicy::default());
    HttpServer::new(service).router()
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, uri, Body::from(body.to_string())).await
}

async fn send(app: &Router, uri: &str, body: Body) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(body)
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn ana() -> Value {
    json!({
        "document": "1111111111",
        "fullName": "Ana Gomez",
        "email": "a@x.com",
        "phone": "3001234567"
    })
}

fn movement(amount: i64) -> Value {
    json!({ "document": "1111111111", "phone": "3001234567", "amount": amount })
}

fn lookup() -> Value {
    json!({ "document": "1111111111", "phone": "3001234567" })
}

async fn registered_with(app: &Router, balance: i64) {
    let (status, _) = post(app, "/api/clients/register", ana()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post(app, "/api/clients/recharge", movement(balance)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let app = create_app().await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_and_duplicate() {
    let app = create_app().await;

    let (status, json) = post(&app, "/api/clients/register", ana()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    assert_eq!(json["code"], "SUCCESS");
    assert_eq!(json["data"]["document"], "1111111111");
    assert_eq!(json["data"]["fullName"], "Ana Gomez");
    assert!(json["data"]["id"].is_string());

    let mut same_email = ana();
    same_email["document"] = json!("2222222222");
    let (status, json) = post(&app, "/api/clients/register", same_email).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "CLIENT_EXISTS");
    assert!(json.get("data").is_none());
}

#[tokio::test]
async fn test_register_rejects_bad_fields() {
    let app = create_app().await;
    let mut bad = ana();
    bad["phone"] = json!("12");

    let (status, json) = post(&app, "/api/clients/register", bad).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_body_gets_envelope() {
    let app = create_app().await;

    let (status, json) = send(&app, "/api/clients/recharge", Body::from("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_recharge_and_balance() {
    let app = create_app().await;
    registered_with(&app, 50_000).await;

    let (status, json) = post(&app, "/api/clients/recharge", movement(0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_AMOUNT");

    let (status, json) = post(&app, "/api/clients/balance", lookup()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["balance"], 50_000);
    assert_eq!(json["data"]["fullName"], "Ana Gomez");

    let (status, json) = post(
        &app,
        "/api/clients/balance",
        json!({ "document": "1111111111", "phone": "3009999999" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "CLIENT_NOT_FOUND");
}

#[tokio::test]
async fn test_payment_flow() {
    let app = create_app().await;
    registered_with(&app, 50_000).await;

    let (status, json) = post(&app, "/api/clients/payment/initiate", movement(20_000)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["email"], "a***@x.com");
    let session_id = json["data"]["sessionId"].as_str().unwrap().to_string();
    let token = json["data"]["tokenFallback"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 6);

    let wrong = if token == "123456" { "654321" } else { "123456" };
    let (status, json) = post(
        &app,
        "/api/clients/payment/confirm",
        json!({ "sessionId": session_id, "token": wrong }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_TOKEN");

    let (status, json) = post(
        &app,
        "/api/clients/payment/confirm",
        json!({ "sessionId": session_id, "token": token }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["newBalance"], 30_000);
    assert_eq!(json["data"]["amount"], 20_000);

    let (status, json) = post(
        &app,
        "/api/clients/payment/confirm",
        json!({ "sessionId": session_id, "token": token }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "TRANSACTION_ALREADY_PROCESSED");

    let (_, json) = post(&app, "/api/clients/balance", lookup()).await;
    assert_eq!(json["data"]["balance"], 30_000);

    let (status, json) = post(&app, "/api/clients/transactions", lookup()).await;
    assert_eq!(status, StatusCode::OK);
    let history = json["data"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert!(
        history
            .iter()
            .any(|t| t["type"] == "PAYMENT" && t["status"] == "COMPLETED" && t["amount"] == 20_000)
    );
    assert!(history.iter().all(|t| t.get("token").is_none()));
}

#[tokio::test]
async fn test_payment_failures() {
    let app = create_app().await;
    registered_with(&app, 10_000).await;

    let (status, json) = post(&app, "/api/clients/payment/initiate", movement(10_001)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "INSUFFICIENT_BALANCE");

    let (status, json) = post(
        &app,
        "/api/clients/payment/confirm",
        json!({ "sessionId": "5f0c6d3e-3a43-4c6b-9a57-2b0f7b1c9e21", "token": "123456" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = create_app().await;

    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["paths"]["/api/clients/payment/confirm"].is_object());
}
