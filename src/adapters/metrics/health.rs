//! Health Check Handlers - Liveness and Readiness Probes
//!
//! Served next to `/metrics` by the exporter. Readiness is derived from
//! the two liveness gauges, so orchestrators and scrapers agree on what
//! "ready" means.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::instruments::MonitorMetrics;

/// Liveness probe: always returns 200 if the process is serving.
pub async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe: 200 only while the probe loop runs against an
/// initialized engine.
pub async fn readiness(State(metrics): State<Arc<MonitorMetrics>>) -> impl IntoResponse {
    if metrics.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}
