use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, agents, api, intent, speech};
use crate::state::AppState;
use std::sync::Arc;

pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(api::readiness))
        .route("/config/validate", post(agents::validate_config))
        .route("/agents/:agent_id/initialize", post(agents::initialize))
        .route("/agents/:agent_id/settings", get(agents::settings))
        .route("/agents/:agent_id/health", get(agents::provider_health))
        .route("/stt/process", post(speech::process_voice))
        .route("/tts/synthesize", post(speech::synthesize))
        .route("/intent/detect", post(intent::detect))
        .route("/metrics/:agent_id", get(admin::agent_metrics))
        .route(
            "/rate-limit/:agent_id/:user_id",
            get(admin::rate_limit_status),
        )
        .route("/cache/:agent_id", delete(admin::purge_cache))
        .route("/files/:file_id", get(admin::download_file))
        .layer(TraceLayer::new_for_http())
}
