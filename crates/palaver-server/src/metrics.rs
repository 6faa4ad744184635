//! `/metrics` endpoint and request counting middleware.

use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use palaver_telemetry::metrics::HTTP_REQUESTS_TOTAL;

use crate::server::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        palaver_telemetry::render(&state.metrics),
    )
}

/// Count every request by method and status class.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let response = next.run(request).await;
    let status = format!("{}xx", response.status().as_u16() / 100);
    counter!(HTTP_REQUESTS_TOTAL, "method" => method, "status" => status).increment(1);
    response
}
