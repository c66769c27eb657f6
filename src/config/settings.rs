//! Typed per-agent voice configuration.
//!
//! Raw agent configuration enters the system as loose JSON and is parsed
//! eagerly into these structures by [`crate::config::validation`]; nothing
//! past that boundary ever sees an untyped map.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of supported speech vendors. Adding a vendor means adding a
/// variant here plus a capability module under `core/providers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[serde(alias = "open_ai")]
    Openai,
    Google,
    Yandex,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Openai => "openai",
            ProviderId::Google => "google",
            ProviderId::Yandex => "yandex",
        }
    }

    pub const ALL: [ProviderId; 3] = [ProviderId::Openai, ProviderId::Google, ProviderId::Yandex];
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "open_ai" => Ok(ProviderId::Openai),
            "google" => Ok(ProviderId::Google),
            "yandex" => Ok(ProviderId::Yandex),
            other => Err(format!(
                "unknown provider '{other}'. Supported providers: openai, google, yandex"
            )),
        }
    }
}

/// How the engine decides whether a generated reply should be spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentMode {
    Keywords,
    Always,
    Disabled,
}

/// Speech-to-text parameter bag, passed through to the provider capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    #[serde(default)]
    pub model: Option<String>,
    /// Language tag, e.g. "en-US" or "ru-RU".
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    /// Per-attempt timeout in seconds; the fallback orchestrator falls back to
    /// its own default when absent.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Text-to-speech parameter bag, passed through to the provider capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Speaking rate (1.0 is normal).
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// One configured provider in an agent's fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderId,
    /// Lower priority is tried first.
    pub priority: i32,
    /// Whether providers *after* this one may be attempted once this one has
    /// failed. It never prevents this provider itself from running.
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,
    #[serde(default)]
    pub stt: Option<SttConfig>,
    #[serde(default)]
    pub tts: Option<TtsConfig>,
    /// Vendor-specific extras, opaque to the core.
    #[serde(default)]
    pub custom_settings: serde_json::Map<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

/// Per-agent voice settings, immutable once loaded for a request cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub enabled: bool,
    pub intent_detection_mode: IntentMode,
    #[serde(default)]
    pub intent_keywords: Vec<String>,
    #[serde(default)]
    pub auto_stt: bool,
    #[serde(default)]
    pub auto_tts_on_keywords: bool,
    #[serde(default = "defaults::max_file_size_mb")]
    pub max_file_size_mb: u32,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "defaults::cache_ttl_hours")]
    pub cache_ttl_hours: u32,
    #[serde(default = "defaults::rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    pub providers: Vec<ProviderConfig>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            intent_detection_mode: IntentMode::Keywords,
            intent_keywords: Vec::new(),
            auto_stt: false,
            auto_tts_on_keywords: false,
            max_file_size_mb: defaults::max_file_size_mb(),
            cache_enabled: true,
            cache_ttl_hours: defaults::cache_ttl_hours(),
            rate_limit_per_minute: defaults::rate_limit_per_minute(),
            providers: Vec::new(),
        }
    }
}

impl VoiceSettings {
    /// Maximum accepted audio payload in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb as u64 * 1024 * 1024
    }

    /// Providers in ascending priority order (lowest tried first).
    pub fn providers_by_priority(&self) -> Vec<ProviderConfig> {
        let mut providers = self.providers.clone();
        providers.sort_by_key(|p| p.priority);
        providers
    }

    /// The provider tried first when no explicit provider is requested.
    pub fn primary_provider(&self) -> Option<ProviderId> {
        self.providers
            .iter()
            .min_by_key(|p| p.priority)
            .map(|p| p.provider)
    }

    /// Looks up the configuration for a specific provider.
    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.provider == id)
    }
}

pub(crate) mod defaults {
    pub fn max_file_size_mb() -> u32 {
        25
    }

    pub fn cache_ttl_hours() -> u32 {
        24
    }

    pub fn rate_limit_per_minute() -> u32 {
        10
    }
}

/// Valid ranges enforced by the validator (out-of-range values are errors,
/// never silently clamped).
pub mod limits {
    pub const MAX_FILE_SIZE_MB: std::ops::RangeInclusive<u32> = 1..=100;
    pub const CACHE_TTL_HOURS: std::ops::RangeInclusive<u32> = 1..=168;
    pub const RATE_LIMIT_PER_MINUTE: std::ops::RangeInclusive<u32> = 1..=100;
}
