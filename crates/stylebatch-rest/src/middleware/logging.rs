//! Request logging middleware.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Paths polled by orchestrators; logged at debug so they do not drown
/// job traffic.
const PROBE_PATHS: [&str; 3] = ["/health", "/ready", "/live"];

/// Logs one line per request with its `x-request-id`.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        warn!(target: "http", %method, %path, %request_id, status, duration_ms, "HTTP request failed");
    } else if PROBE_PATHS.contains(&path.as_str()) {
        debug!(target: "http", %method, %path, status, duration_ms, "Probe request");
    } else {
        info!(target: "http", %method, %path, %request_id, status, duration_ms, "HTTP request completed");
    }

    response
}
