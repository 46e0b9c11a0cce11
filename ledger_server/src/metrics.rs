//! Prometheus metrics for the ledger server.
//!
//! Recording is always on; the `/metrics` scrape endpoint only exists when
//! [`init_metrics`] installs the exporter. Without an installed recorder the
//! `metrics` macros are no-ops.
//!
//! # Metrics
//!
//! - `http_requests_total{method,status}` / `http_request_duration_ms{method}`
//! - `wallet_operations_total{type,outcome}` / `wallet_operation_duration_ms{type}`
//! - `wallets_created_total`

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use wallet_ledger::OperationType;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Ledger Metrics
// ============================================================================

/// Bounded `type` label for a requested operation type.
///
/// Anything that is not a known operation type is reported as `unknown`,
/// so client input never creates new series.
pub fn operation_type_label(raw: &str) -> &'static str {
    raw.parse::<OperationType>()
        .map_or("unknown", |operation_type| operation_type.as_str())
}

/// Record the outcome of one operation request.
///
/// `operation_type` comes from [`operation_type_label`]; `outcome` is
/// `committed` or the error class.
pub fn wallet_operations_total(operation_type: &'static str, outcome: &'static str) {
    metrics::counter!("wallet_operations_total",
        "type" => operation_type,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record how long one operation took, lock wait included.
pub fn wallet_operation_duration_ms(operation_type: &'static str, duration_ms: f64) {
    metrics::histogram!("wallet_operation_duration_ms",
        "type" => operation_type
    )
    .record(duration_ms);
}

/// Increment created wallets counter.
pub fn wallets_created_total() {
    metrics::counter!("wallets_created_total").increment(1);
}
