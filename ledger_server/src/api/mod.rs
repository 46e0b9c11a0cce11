//! HTTP API for the wallet ledger.
//!
//! # Endpoints Overview
//!
//! ## Wallets
//! - `POST   /api/v1/wallets/` - Create a wallet with a zero balance
//! - `GET    /api/v1/wallets/{wallet_uuid}/` - Get a wallet
//! - `DELETE /api/v1/wallets/{wallet_uuid}/` - Delete a wallet without operations
//!
//! ## Operations
//! - `POST /api/v1/wallets/{wallet_uuid}/operation/` - Deposit or withdraw
//! - `GET  /api/v1/wallets/{wallet_uuid}/operations/` - Operation history
//!
//! ## Health Check
//! - `GET /health` - Server health status
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ledger_server::api::{create_router, AppState};
//! use std::sync::Arc;
//! use wallet_ledger::{InMemoryWalletStore, OperationProcessor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let processor = OperationProcessor::new(Arc::new(InMemoryWalletStore::new()));
//! let state = AppState {
//!     processor: Arc::new(processor),
//! };
//!
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod middleware;
pub mod wallets;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use wallet_ledger::OperationProcessor;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<OperationProcessor>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET    /health                                    - Health check
/// POST   /api/v1/wallets/                           - Create wallet
/// GET    /api/v1/wallets/{wallet_uuid}/             - Get wallet
/// DELETE /api/v1/wallets/{wallet_uuid}/             - Delete wallet
/// POST   /api/v1/wallets/{wallet_uuid}/operation/   - Apply operation
/// GET    /api/v1/wallets/{wallet_uuid}/operations/  - List operations
/// ```
///
/// Any other method on a known path answers `405 Method Not Allowed`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(middleware::request_tracing_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/wallets/", post(wallets::create_wallet))
        .route(
            "/wallets/{wallet_uuid}/",
            get(wallets::get_wallet).delete(wallets::delete_wallet),
        )
        .route(
            "/wallets/{wallet_uuid}/operation/",
            post(wallets::create_operation),
        )
        .route(
            "/wallets/{wallet_uuid}/operations/",
            get(wallets::list_operations),
        )
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the storage backend answers, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:8000/health
/// # {"status":"healthy","storage":true,"version":"0.1.0","timestamp":"2025-01-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_healthy = match state.processor.store().health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Storage health check failed");
            false
        }
    };

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "storage": storage_healthy,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
