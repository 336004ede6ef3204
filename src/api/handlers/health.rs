//! Liveness endpoint

use axum::extract::State;
use axum::response::Response;
use serde::Serialize;
use tracing::warn;

use super::ApiState;
use crate::api::envelope::ApiResponse;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub assistant: &'static str,
    pub version: &'static str,
}

/// GET /health - Service and database liveness
pub async fn health_check(State(state): State<ApiState>) -> Response {
    let database = match state.service.database().ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Health check: database unreachable");
            false
        }
    };

    ApiResponse::ok(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        assistant: state.service.assistant_backend(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
