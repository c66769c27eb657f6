//! Agent configuration endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::config::settings::VoiceSettings;
use crate::config::validation::ValidationReport;
use crate::core::registry::ProviderHealthReport;
use crate::errors::app_error::VoiceResult;
use crate::state::AppState;

/// `POST /v1/config/validate`: dry-run validation of a raw configuration.
/// Always 200; the report carries the verdict.
pub async fn validate_config(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<Value>,
) -> Json<ValidationReport> {
    Json(state.orchestrator.validate_config(&raw))
}

/// `POST /v1/agents/{agent_id}/initialize`: validates and installs an
/// agent's voice configuration.
pub async fn initialize(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Json(raw): Json<Value>,
) -> VoiceResult<Json<ValidationReport>> {
    let report = state.orchestrator.initialize_agent(&agent_id, &raw)?;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub agent_id: String,
    pub settings: VoiceSettings,
}

/// `GET /v1/agents/{agent_id}/settings`
pub async fn settings(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> VoiceResult<Json<SettingsResponse>> {
    let settings = state.orchestrator.settings(&agent_id)?;
    Ok(Json(SettingsResponse {
        agent_id,
        settings: (*settings).clone(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ProviderHealthResponse {
    pub agent_id: String,
    pub providers: Vec<ProviderHealthReport>,
}

/// `GET /v1/agents/{agent_id}/health`: per-provider health without forcing
/// initialization.
pub async fn provider_health(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> VoiceResult<Json<ProviderHealthResponse>> {
    let providers = state.orchestrator.provider_health(&agent_id)?;
    Ok(Json(ProviderHealthResponse {
        agent_id,
        providers,
    }))
}
