//! Wallet and operation API handlers.
//!
//! # Examples
//!
//! Create a wallet:
//! ```bash
//! curl -X POST http://localhost:8000/api/v1/wallets/
//! ```
//!
//! Deposit into it:
//! ```bash
//! curl -X POST http://localhost:8000/api/v1/wallets/WALLET_UUID/operation/ \
//!   -H "Content-Type: application/json" \
//!   -d '{"operation_type": "DEPOSIT", "amount": 1000}'
//! ```

use std::time::Instant;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use wallet_ledger::{
    Operation, OperationRequest, OperationType, Wallet, WalletError,
    wallet::{ErrorKind, validation},
};

use super::AppState;
use crate::{logging, metrics};

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub id: i64,
    pub uuid: Uuid,
    pub balance: i64,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            uuid: wallet.uuid,
            balance: wallet.balance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub id: i64,
    pub operation_type: OperationType,
    pub amount: i64,
    pub wallet: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Operation> for OperationResponse {
    fn from(op: Operation) -> Self {
        Self {
            id: op.id,
            operation_type: op.operation_type,
            amount: op.amount,
            wallet: op.wallet,
            created_at: op.created_at,
        }
    }
}

/// Operation request body
///
/// `amount` is taken as a raw JSON value so that integer strings such as
/// `"1000"` are accepted alongside JSON integers.
#[derive(Debug, Deserialize)]
pub struct OperationPayload {
    #[serde(default)]
    pub operation_type: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn wallet_error_response(err: &WalletError) -> ApiError {
    let status = match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => {
            tracing::error!(error = %err, "Internal wallet error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.client_message())
}

/// Label used for the `outcome` of metrics and logs
fn outcome_label(result: &Result<Operation, WalletError>) -> &'static str {
    match result {
        Ok(_) => "committed",
        Err(e) => match e.kind() {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        },
    }
}

/// A malformed identifier can never name a wallet, so it is a 404
fn parse_wallet_uuid(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        tracing::debug!(wallet = raw, "Malformed wallet identifier");
        error_response(StatusCode::NOT_FOUND, "Wallet not found")
    })
}

/// Turn the request body into an [`OperationRequest`]
fn parse_payload(payload: OperationPayload) -> Result<OperationRequest, WalletError> {
    let operation_type = payload.operation_type.unwrap_or_default();
    let amount = match payload.amount {
        Some(Value::Number(n)) => validation::parse_amount(&n.to_string())?,
        Some(Value::String(s)) => validation::parse_amount(&s)?,
        Some(other) => return Err(WalletError::InvalidAmountFormat(other.to_string())),
        None => return Err(WalletError::InvalidAmountFormat(String::new())),
    };
    Ok(OperationRequest::new(operation_type, amount))
}

/// Create a wallet with a zero balance.
///
/// Returns `201 Created` with `{"id", "uuid", "balance"}`.
pub async fn create_wallet(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<WalletResponse>), ApiError> {
    let wallet = state
        .processor
        .create_wallet()
        .await
        .map_err(|e| wallet_error_response(&e))?;

    metrics::wallets_created_total();
    Ok((StatusCode::CREATED, Json(wallet.into())))
}

/// Get a wallet and its current balance.
///
/// # Errors
///
/// - `404 Not Found`: Unknown or malformed wallet identifier
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(wallet_uuid): Path<String>,
) -> Result<Json<WalletResponse>, ApiError> {
    let wallet_uuid = parse_wallet_uuid(&wallet_uuid)?;
    let wallet = state
        .processor
        .get_wallet(wallet_uuid)
        .await
        .map_err(|e| wallet_error_response(&e))?;

    Ok(Json(wallet.into()))
}

/// Delete a wallet that has no operations.
///
/// # Errors
///
/// - `404 Not Found`: Unknown or malformed wallet identifier
/// - `409 Conflict`: The wallet has operations
pub async fn delete_wallet(
    State(state): State<AppState>,
    Path(wallet_uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    let wallet_uuid = parse_wallet_uuid(&wallet_uuid)?;
    state
        .processor
        .delete_wallet(wallet_uuid)
        .await
        .map_err(|e| wallet_error_response(&e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Apply a deposit or withdrawal to a wallet.
///
/// # Request Body
///
/// ```json
/// {"operation_type": "WITHDRAW", "amount": 250}
/// ```
///
/// # Response
///
/// Returns `201 Created` with the operation record:
/// ```json
/// {"id": 12, "operation_type": "WITHDRAW", "amount": 250, "wallet": "...", "created_at": "..."}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body, invalid amount or type, insufficient funds
/// - `404 Not Found`: Unknown or malformed wallet identifier
pub async fn create_operation(
    State(state): State<AppState>,
    Path(wallet_uuid): Path<String>,
    payload: Result<Json<OperationPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<OperationResponse>), ApiError> {
    let wallet_uuid = parse_wallet_uuid(&wallet_uuid)?;
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected operation body");
        error_response(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;

    let type_label =
        metrics::operation_type_label(payload.operation_type.as_deref().unwrap_or_default());
    let started = Instant::now();

    let result = match parse_payload(payload) {
        Ok(request) => state.processor.process(wallet_uuid, &request).await,
        Err(e) => Err(e),
    };

    let elapsed = started.elapsed();
    let outcome = outcome_label(&result);
    metrics::wallet_operations_total(type_label, outcome);
    metrics::wallet_operation_duration_ms(type_label, elapsed.as_secs_f64() * 1000.0);
    logging::log_operation_outcome(&wallet_uuid.to_string(), type_label, outcome, elapsed);

    let operation = result.map_err(|e| wallet_error_response(&e))?;
    Ok((StatusCode::CREATED, Json(operation.into())))
}

/// List the committed operations of a wallet, oldest first.
///
/// # Errors
///
/// - `404 Not Found`: Unknown or malformed wallet identifier
pub async fn list_operations(
    State(state): State<AppState>,
    Path(wallet_uuid): Path<String>,
) -> Result<Json<Vec<OperationResponse>>, ApiError> {
    let wallet_uuid = parse_wallet_uuid(&wallet_uuid)?;
    let operations = state
        .processor
        .list_operations(wallet_uuid)
        .await
        .map_err(|e| wallet_error_response(&e))?;

    Ok(Json(operations.into_iter().map(Into::into).collect()))
}
