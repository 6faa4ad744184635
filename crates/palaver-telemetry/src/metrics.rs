//! Prometheus recorder and metric name constants.

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Handle to the process-wide Prometheus recorder, installing it on first use.
///
/// If another recorder already owns the global slot, a detached recorder's
/// handle is returned instead so `/metrics` still renders.
pub fn prometheus_handle() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("prometheus metrics recorder installed");
                handle
            }
            Err(e) => {
                warn!(error = %e, "metrics recorder already installed, using detached handle");
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

/// Render Prometheus text format from a recorder handle.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric names, shared so call sites cannot drift.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Upgrades refused because the connection limit was reached (counter).
pub const WS_CONNECTIONS_REJECTED_TOTAL: &str = "ws_connections_rejected_total";
/// Admissions denied (counter, labels: reason).
pub const CHAT_ADMISSIONS_DENIED_TOTAL: &str = "chat_admissions_denied_total";
/// Chat messages persisted and published (counter, labels: source).
pub const CHAT_MESSAGES_TOTAL: &str = "chat_messages_total";
/// Inbound payloads rejected (counter, labels: kind).
pub const CHAT_MESSAGE_ERRORS_TOTAL: &str = "chat_message_errors_total";
/// Deliveries dropped because a member's queue was full or closed (counter).
pub const CHAT_DELIVERY_DROPS_TOTAL: &str = "chat_delivery_drops_total";
/// Rooms with at least one member (gauge).
pub const CHAT_ROOMS_ACTIVE: &str = "chat_rooms_active";
/// Time from receipt to publish of an inbound message (histogram).
pub const CHAT_RECEIVE_DURATION_SECONDS: &str = "chat_receive_duration_seconds";
/// HTTP API requests total (counter, labels: route, status).
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
