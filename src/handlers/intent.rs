//! Voice intent endpoint.

use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde::Deserialize;

use crate::core::intent::IntentResult;
use crate::errors::app_error::VoiceResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    pub agent_id: String,
    pub text: String,
}

/// `POST /v1/intent/detect`: should this reply be spoken?
pub async fn detect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IntentRequest>,
) -> VoiceResult<Json<IntentResult>> {
    let result = state
        .orchestrator
        .should_voice(&request.agent_id, &request.text)?;
    Ok(Json(result))
}
