use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};

use crate::state::AppState;

/// Health check handler.
/// Returns a simple JSON response indicating the server is running.
pub async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "OK",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

/// Readiness handler: engine-wide counts plus per-agent provider health.
pub async fn readiness(State(state): State<Arc<AppState>>) -> Json<Value> {
    let status = state.orchestrator.status();
    Json(json!({
        "status": "OK",
        "agents": status.agents,
        "provider_handles": status.provider_handles,
        "active_rate_windows": status.active_rate_windows,
        "providers": status.providers,
    }))
}
