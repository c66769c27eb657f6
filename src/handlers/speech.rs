//! Speech processing endpoints: transcription in, synthesis out.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::Json,
};
use serde::Deserialize;
use tracing::info;

use crate::config::settings::ProviderId;
use crate::core::orchestrator::{SttProcessResponse, TtsSynthesisResponse};
use crate::errors::app_error::{VoiceError, VoiceResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SttQuery {
    pub agent_id: String,
    pub user_id: String,
    /// Pin the request to one configured provider, bypassing fallback.
    pub provider: Option<String>,
    /// Override the configured recognition language for this request.
    pub language: Option<String>,
}

fn parse_provider(raw: Option<&str>) -> VoiceResult<Option<ProviderId>> {
    raw.map(|s| s.parse::<ProviderId>().map_err(VoiceError::BadRequest))
        .transpose()
}

/// `POST /v1/stt/process`: transcribes a raw audio body.
///
/// The audio MIME type comes from the `Content-Type` header.
pub async fn process_voice(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SttQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> VoiceResult<Json<SttProcessResponse>> {
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        // Parameters like `; codecs=opus` are not part of the format.
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .ok_or_else(|| VoiceError::BadRequest("Content-Type header is required".to_string()))?;

    if body.is_empty() {
        return Err(VoiceError::BadRequest("audio body must not be empty".to_string()));
    }

    let provider = parse_provider(query.provider.as_deref())?;

    info!(
        agent_id = %query.agent_id,
        user_id = %query.user_id,
        bytes = body.len(),
        %mime_type,
        "voice input received"
    );

    let response = state
        .orchestrator
        .process_voice_input(
            &query.agent_id,
            &query.user_id,
            body,
            &mime_type,
            provider,
            query.language.as_deref(),
        )
        .await?;

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub agent_id: String,
    pub user_id: String,
    pub text: String,
    pub provider: Option<String>,
    /// Override the configured voice for this request.
    pub voice: Option<String>,
    /// Override the configured synthesis language for this request.
    pub language: Option<String>,
}

/// `POST /v1/tts/synthesize`: synthesizes a reply and returns a download URL.
pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TtsRequest>,
) -> VoiceResult<Json<TtsSynthesisResponse>> {
    let provider = parse_provider(request.provider.as_deref())?;

    info!(
        agent_id = %request.agent_id,
        user_id = %request.user_id,
        chars = request.text.len(),
        "synthesis request received"
    );

    let response = state
        .orchestrator
        .synthesize_response(
            &request.agent_id,
            &request.user_id,
            &request.text,
            provider,
            request.voice.as_deref(),
            request.language.as_deref(),
        )
        .await?;

    Ok(Json(response))
}
