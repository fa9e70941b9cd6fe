use axum::{extract::Request, middleware::Next, response::Response};
use metrics::{counter, histogram};
use std::time::Instant;

/// Logs method, path, status and latency of every request.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    tracing::debug!(method = %method, uri = %uri, "Incoming request");

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    counter!("stockline_http.requests", 1, "status" => status.as_u16().to_string());
    histogram!("stockline_http.request.duration", duration);

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms = duration.as_millis() as u64,
            "Request failed"
        );
    } else {
        tracing::info!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms = duration.as_millis() as u64,
            "Request completed"
        );
    }

    response
}
