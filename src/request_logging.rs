// src/request_logging.rs
//! Middleware logging one line per request

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

/// Logs method, path, status and latency. Query strings are left out
/// because the OAuth callback carries the authorization code in them.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        warn!(method = %method, path = %path, status = status.as_u16(), latency_ms, "📤 Request failed");
    } else {
        info!(method = %method, path = %path, status = status.as_u16(), latency_ms, "📤 Request handled");
    }

    response
}
