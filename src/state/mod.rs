use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::orchestrator::VoiceOrchestrator;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    /// The orchestration engine; handlers go through it for everything.
    pub orchestrator: Arc<VoiceOrchestrator>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let orchestrator = Arc::new(VoiceOrchestrator::new(config.clone()));
        Arc::new(Self {
            config,
            orchestrator,
        })
    }

    /// State around a pre-built engine, used by tests that inject seams.
    pub fn with_orchestrator(config: ServerConfig, orchestrator: Arc<VoiceOrchestrator>) -> Arc<Self> {
        Arc::new(Self {
            config,
            orchestrator,
        })
    }
}
