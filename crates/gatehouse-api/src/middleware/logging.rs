//! Request/response logging middleware.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Log each request with method, path, status, and duration.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;
    if status >= 500 {
        tracing::error!(%method, %path, status, duration_ms, "Request completed");
    } else if status >= 400 {
        tracing::warn!(%method, %path, status, duration_ms, "Request completed");
    } else {
        tracing::info!(%method, %path, status, duration_ms, "Request completed");
    }

    response
}
