//! Integration tests for the HTTP API.
//!
//! Requests go through the full router (middleware included) on an
//! in-memory store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ledger_server::api::{AppState, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method
use uuid::Uuid;
use wallet_ledger::{InMemoryWalletStore, OperationProcessor};

/// Helper to create a test router over a fresh in-memory store
fn create_test_server() -> axum::Router {
    let processor = OperationProcessor::new(Arc::new(InMemoryWalletStore::new()));
    create_router(AppState {
        processor: Arc::new(processor),
    })
}

/// Send a request and return status and decoded JSON body
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_wallet(app: &axum::Router) -> String {
    let (status, body) = send(app, "POST", "/api/v1/wallets/", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["uuid"].as_str().unwrap().to_string()
}

async fn operate(app: &axum::Router, wallet: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/api/v1/wallets/{wallet}/operation/"),
        Some(body.to_string()),
    )
    .await
}

async fn balance(app: &axum::Router, wallet: &str) -> i64 {
    let (status, body) = send(app, "GET", &format!("/api/v1/wallets/{wallet}/"), None).await;
    assert_eq!(status, StatusCode::OK);
    body["balance"].as_i64().unwrap()
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server();

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], true);
}

#[tokio::test]
async fn test_request_id_echoed() {
    let app = create_test_server();

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-42");
}

// ============================================================================
// Wallet Tests
// ============================================================================

#[tokio::test]
async fn test_create_and_get_wallet() {
    let app = create_test_server();

    let (status, created) = send(&app, "POST", "/api/v1/wallets/", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["balance"], 0);
    assert!(created["id"].is_i64());

    let uuid = created["uuid"].as_str().unwrap();
    let (status, fetched) = send(&app, "GET", &format!("/api/v1/wallets/{uuid}/"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_get_unknown_or_malformed_wallet() {
    let app = create_test_server();

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/wallets/{}/", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, "GET", "/api/v1/wallets/not-a-uuid/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_wallet() {
    let app = create_test_server();

    let used = create_wallet(&app).await;
    operate(&app, &used, json!({"operation_type": "DEPOSIT", "amount": 5})).await;
    let (status, body) = send(&app, "DELETE", &format!("/api/v1/wallets/{used}/"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let unused = create_wallet(&app).await;
    let (status, _) = send(&app, "DELETE", &format!("/api/v1/wallets/{unused}/"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/v1/wallets/{unused}/"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Operation Tests
// ============================================================================

#[tokio::test]
async fn test_deposit_then_withdraw() {
    let app = create_test_server();
    let wallet = create_wallet(&app).await;

    let (status, op) = operate(
        &app,
        &wallet,
        json!({"operation_type": "DEPOSIT", "amount": 1000}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(op["operation_type"], "DEPOSIT");
    assert_eq!(op["amount"], 1000);
    assert_eq!(op["wallet"], wallet.as_str());

    let (status, _) = operate(
        &app,
        &wallet,
        json!({"operation_type": "WITHDRAW", "amount": 400}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(balance(&app, &wallet).await, 600);

    let (status, ops) = send(
        &app,
        "GET",
        &format!("/api/v1/wallets/{wallet}/operations/"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ops = ops.as_array().unwrap();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0]["operation_type"], "DEPOSIT");
    assert_eq!(ops[1]["operation_type"], "WITHDRAW");
}

#[tokio::test]
async fn test_insufficient_funds() {
    let app = create_test_server();
    let wallet = create_wallet(&app).await;
    operate(&app, &wallet, json!({"operation_type": "DEPOSIT", "amount": 10})).await;

    let (status, body) = operate(
        &app,
        &wallet,
        json!({"operation_type": "WITHDRAW", "amount": 1000}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Insufficient funds on the balance to perform the operation"
    );
    assert_eq!(balance(&app, &wallet).await, 10);
}

#[tokio::test]
async fn test_operation_on_unknown_wallet() {
    let app = create_test_server();

    let (status, _) = operate(
        &app,
        &Uuid::new_v4().to_string(),
        json!({"operation_type": "DEPOSIT", "amount": 10}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = operate(
        &app,
        "garbage",
        json!({"operation_type": "DEPOSIT", "amount": 10}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_integer_string_amount_accepted() {
    let app = create_test_server();
    let wallet = create_wallet(&app).await;

    let (status, op) = operate(
        &app,
        &wallet,
        json!({"operation_type": "DEPOSIT", "amount": "1000"}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(op["amount"], 1000);
    assert_eq!(balance(&app, &wallet).await, 1000);
}

#[tokio::test]
async fn test_invalid_requests_rejected() {
    let app = create_test_server();
    let wallet = create_wallet(&app).await;

    let invalid = [
        json!({"operation_type": "DEPOSIT", "amount": 0}),
        json!({"operation_type": "DEPOSIT", "amount": -5}),
        json!({"operation_type": "DEPOSIT", "amount": 10.5}),
        json!({"operation_type": "DEPOSIT", "amount": "abc"}),
        json!({"operation_type": "DEPOSIT", "amount": "99999999999999999999"}),
        json!({"operation_type": "DEPOSIT"}),
        json!({"operation_type": "REFUND", "amount": 10}),
        json!({"amount": 10}),
    ];
    for body in invalid {
        let (status, response) = operate(&app, &wallet, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(response["error"].is_string(), "{body}");
    }

    // Not JSON at all
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/wallets/{wallet}/operation/"),
        Some("{not json".to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(balance(&app, &wallet).await, 0);
}

#[tokio::test]
async fn test_operation_method_not_allowed() {
    let app = create_test_server();
    let wallet = create_wallet(&app).await;
    let uri = format!("/api/v1/wallets/{wallet}/operation/");

    for method in ["GET", "PUT", "PATCH", "DELETE"] {
        let (status, _) = send(&app, method, &uri, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_http_withdrawals() {
    let app = create_test_server();
    let wallet = create_wallet(&app).await;
    operate(&app, &wallet, json!({"operation_type": "DEPOSIT", "amount": 100})).await;

    let mut tasks = tokio::task::JoinSet::new();
    for amount in [60, 40] {
        let app = app.clone();
        let wallet = wallet.clone();
        tasks.spawn(async move {
            operate(
                &app,
                &wallet,
                json!({"operation_type": "WITHDRAW", "amount": amount}),
            )
            .await
            .0
        });
    }
    while let Some(status) = tasks.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::CREATED);
    }

    assert_eq!(balance(&app, &wallet).await, 0);
}
