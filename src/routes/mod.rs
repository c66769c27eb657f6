pub mod api;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::handlers::api::health_check;
use crate::state::AppState;

/// Builds the full application router: a bare health probe at the root plus
/// the versioned API under `/v1`.
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .nest("/v1", api::create_api_router())
        .with_state(state)
}
