//! Request tracing middleware.
//!
//! Assigns every request an id (taken from `x-request-id` when the client
//! sends one), runs the handler inside a span carrying that id, echoes the id
//! on the response and records HTTP metrics.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::metrics;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generate or extract request ID from headers
fn get_or_generate_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Middleware adding request id, request logging and HTTP metrics
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware};
/// use ledger_server::api::middleware::request_tracing_middleware;
///
/// # async fn example() {
/// let app: Router = Router::new()
///     .route("/", get(|| async { "Hello" }))
///     .layer(middleware::from_fn(request_tracing_middleware));
/// # }
/// ```
pub async fn request_tracing_middleware(request: Request, next: Next) -> Response {
    let request_id = get_or_generate_request_id(request.headers());
    let method = request.method().clone();
    let started = Instant::now();

    let span = tracing::info_span!("request", request_id = %request_id);
    async move {
        tracing::info!(method = %method, uri = %request.uri(), "Request started");

        let mut response = next.run(request).await;

        if let Ok(header_value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let status = response.status();
        metrics::http_requests_total(method.as_str(), status.as_u16());
        metrics::http_request_duration_ms(method.as_str(), elapsed_ms);

        tracing::info!(
            status = %status,
            duration_ms = elapsed_ms as u64,
            "Request completed"
        );

        response
    }
    .instrument(span)
    .await
}
