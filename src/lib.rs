pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use config::settings::{IntentMode, ProviderConfig, ProviderId, VoiceSettings};
pub use config::validation::ValidationReport;
pub use crate::core::orchestrator::VoiceOrchestrator;
pub use errors::app_error::{ErrorKind, VoiceError, VoiceResult};
pub use state::AppState;
