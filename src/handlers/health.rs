//! Health check endpoint
//!
//! Reports whether the monitor process itself is doing its job.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// "operational", or "degraded" once a write or cycle has failed
    pub monitor_status: &'static str,
    pub services: usize,
}

/// Health check handler
///
/// Always 200 while the process is up. `monitor_status` turns "degraded"
/// after any persistence failure or aborted cycle since startup.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let metrics = state.metrics();
    let degraded =
        metrics.persistence_failures_count() > 0 || metrics.cycle_failures_count() > 0;

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            monitor_status: if degraded { "degraded" } else { "operational" },
            services: state.config().websites.len(),
        }),
    )
}
