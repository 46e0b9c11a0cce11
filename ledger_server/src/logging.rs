//! Structured logging configuration.
//!
//! `tracing` events from the server and `log` records from `wallet_ledger`
//! go through the same subscriber.

use std::time::Duration;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var; the default is
/// `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use ledger_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log the outcome of one operation request
///
/// Rejections are expected business outcomes and logged at info level;
/// internal failures are logged as errors.
///
/// # Arguments
///
/// * `wallet` - External wallet identifier
/// * `operation_type` - Operation type label (`unknown` for unrecognized types)
/// * `outcome` - `committed` or the error class
/// * `elapsed` - Time spent, lock wait included
pub fn log_operation_outcome(wallet: &str, operation_type: &str, outcome: &str, elapsed: Duration) {
    let duration_ms = duration_millis(elapsed);
    match outcome {
        "committed" => tracing::info!(
            wallet = wallet,
            operation_type = operation_type,
            duration_ms = duration_ms,
            "Operation committed"
        ),
        "internal" => tracing::error!(
            wallet = wallet,
            operation_type = operation_type,
            duration_ms = duration_ms,
            "Operation failed"
        ),
        _ => tracing::info!(
            wallet = wallet,
            operation_type = operation_type,
            outcome = outcome,
            duration_ms = duration_ms,
            "Operation rejected"
        ),
    }

    if duration_ms > 1000 {
        tracing::warn!(
            wallet = wallet,
            duration_ms = duration_ms,
            "PERFORMANCE: Slow operation, wallet may be heavily contended"
        );
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
fn duration_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
