//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `closed` once the bus has shut down.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Configured retention in seconds; absent when unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_secs: Option<i64>,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status) = if state.server.is_closed() {
        (StatusCode::SERVICE_UNAVAILABLE, "closed")
    } else {
        (StatusCode::OK, "ok")
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        retention_secs: state.server.retention().map(|r| r.num_seconds()),
    };
    (code, Json(body))
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
