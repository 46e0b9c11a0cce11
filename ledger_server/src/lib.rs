//! HTTP server for the wallet ledger.
//!
//! - [`api`]: router, handlers and request tracing middleware
//! - [`config`]: environment and CLI configuration
//! - [`logging`]: structured logging setup
//! - [`metrics`]: Prometheus metrics

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
