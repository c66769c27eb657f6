pub mod settings;
pub mod validation;

use std::env;

/// Server-level configuration loaded from the environment.
///
/// Per-agent voice configuration is *not* part of this struct; agents hand
/// their configuration to the engine at initialization time and the engine
/// only validates and consumes it.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL used when minting download URLs for synthesized audio.
    pub public_base_url: String,
    /// Policy for rate-limit store outages: the engine fails closed (rejects
    /// the request) unless this is explicitly enabled.
    pub rate_limit_fail_open: bool,
    /// Upper bound on cached STT transcripts held in memory.
    pub cache_max_entries: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_base_url: "http://localhost:3000".to_string(),
            rate_limit_fail_open: false,
            cache_max_entries: 100_000,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let port = match env::var("VOXGATE_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| format!("VOXGATE_PORT is not a valid port: '{raw}'"))?,
            Err(_) => defaults.port,
        };

        let cache_max_entries = match env::var("VOXGATE_CACHE_MAX_ENTRIES") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| format!("VOXGATE_CACHE_MAX_ENTRIES is not a number: '{raw}'"))?,
            Err(_) => defaults.cache_max_entries,
        };

        let host = env::var("VOXGATE_HOST").unwrap_or(defaults.host);
        let public_base_url = env::var("VOXGATE_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"));

        let rate_limit_fail_open = env::var("VOXGATE_RATE_LIMIT_FAIL_OPEN")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.rate_limit_fail_open);

        Ok(Self {
            host,
            port,
            public_base_url,
            rate_limit_fail_open,
            cache_max_entries,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub use settings::{IntentMode, ProviderConfig, ProviderId, SttConfig, TtsConfig, VoiceSettings};
pub use validation::{ConfigValidator, ValidationReport};
