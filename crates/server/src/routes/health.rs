use axum::{Json, extract::State};

use famledger_api::HealthResponse;

use crate::AppState;

/// GET /api/health — server liveness check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.backend.to_string(),
    })
}
