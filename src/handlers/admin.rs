//! Operational endpoints: metrics, rate-limit status, cache purge, and
//! synthesized file retrieval.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::info;

use crate::core::orchestrator::AgentMetrics;
use crate::core::rate_limit::Admission;
use crate::errors::app_error::VoiceResult;
use crate::state::AppState;

/// `GET /v1/metrics/{agent_id}`
pub async fn agent_metrics(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> VoiceResult<Json<AgentMetrics>> {
    Ok(Json(state.orchestrator.agent_metrics(&agent_id)?))
}

/// `GET /v1/rate-limit/{agent_id}/{user_id}`: window usage, non-consuming.
pub async fn rate_limit_status(
    State(state): State<Arc<AppState>>,
    Path((agent_id, user_id)): Path<(String, String)>,
) -> VoiceResult<Json<Admission>> {
    Ok(Json(
        state.orchestrator.rate_limit_status(&agent_id, &user_id)?,
    ))
}

/// `DELETE /v1/cache/{agent_id}`: drops the agent's cached transcripts.
pub async fn purge_cache(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> VoiceResult<Json<serde_json::Value>> {
    state.orchestrator.purge_cache(&agent_id)?;
    info!(agent_id, "cache purge requested");
    Ok(Json(json!({ "purged": true, "agent_id": agent_id })))
}

/// `GET /v1/files/{file_id}`: serves a synthesized audio payload.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> VoiceResult<Response> {
    let (object, bytes) = state.orchestrator.stored_file(&file_id)?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, object.content_type),
            (header::CONTENT_LENGTH, object.size_bytes.to_string()),
        ],
        bytes,
    )
        .into_response())
}
