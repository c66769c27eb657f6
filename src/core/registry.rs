//! Per-agent provider handle registry.
//!
//! Maps `(agent_id, provider_id)` to a ready-to-use capability handle, lazily
//! and exactly once per agent lifetime. First-use initialization is a
//! single-writer, many-reader operation: concurrent callers serialize on a
//! per-key slot and the losers reuse the winner's handle instead of racing to
//! construct duplicates.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::settings::{ProviderConfig, ProviderId, SttConfig, TtsConfig};
use crate::core::providers::{
    CredentialStore, ProviderFactory, ProviderFailure, SpeechProvider, Transcript,
    VendorProviderFactory,
};

/// Health of one `(agent, provider)` handle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum ProviderHealth {
    Uninitialized,
    Healthy,
    MissingCredentials,
    Error(String),
}

/// Runtime capability handle bound to one `(agent_id, provider_id)` pair.
///
/// Handles in a non-healthy state fail fast with
/// [`ProviderFailure::Unavailable`] so the fallback orchestrator can move on
/// without treating the miss as a hard error.
pub struct ProviderHandle {
    provider_id: ProviderId,
    health: ProviderHealth,
    capability: Option<Arc<dyn SpeechProvider>>,
    stt: Option<SttConfig>,
    tts: Option<TtsConfig>,
}

impl ProviderHandle {
    fn healthy(config: &ProviderConfig, capability: Arc<dyn SpeechProvider>) -> Self {
        Self {
            provider_id: config.provider,
            health: ProviderHealth::Healthy,
            capability: Some(capability),
            stt: config.stt.clone(),
            tts: config.tts.clone(),
        }
    }

    fn failed(config: &ProviderConfig, health: ProviderHealth) -> Self {
        Self {
            provider_id: config.provider,
            health,
            capability: None,
            stt: config.stt.clone(),
            tts: config.tts.clone(),
        }
    }

    pub fn provider_id(&self) -> ProviderId {
        self.provider_id
    }

    pub fn health(&self) -> &ProviderHealth {
        &self.health
    }

    pub fn is_healthy(&self) -> bool {
        self.health == ProviderHealth::Healthy
    }

    pub fn supports_stt(&self) -> bool {
        self.stt.is_some()
    }

    pub fn supports_tts(&self) -> bool {
        self.tts.is_some()
    }

    pub fn stt_config(&self) -> Option<&SttConfig> {
        self.stt.as_ref()
    }

    pub fn tts_config(&self) -> Option<&TtsConfig> {
        self.tts.as_ref()
    }

    fn capability(&self) -> Result<&Arc<dyn SpeechProvider>, ProviderFailure> {
        match (&self.health, &self.capability) {
            (ProviderHealth::Healthy, Some(capability)) => Ok(capability),
            (ProviderHealth::MissingCredentials, _) => Err(ProviderFailure::Unavailable(format!(
                "credentials missing for provider '{}'",
                self.provider_id
            ))),
            (ProviderHealth::Error(detail), _) => Err(ProviderFailure::Unavailable(format!(
                "provider '{}' failed to initialize: {detail}",
                self.provider_id
            ))),
            _ => Err(ProviderFailure::Unavailable(format!(
                "provider '{}' is not initialized",
                self.provider_id
            ))),
        }
    }

    pub async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
    ) -> Result<Transcript, ProviderFailure> {
        let capability = self.capability()?;
        let config = self.stt.as_ref().ok_or_else(|| {
            ProviderFailure::Unavailable(format!(
                "provider '{}' has no STT configuration",
                self.provider_id
            ))
        })?;
        capability.transcribe(audio, mime_type, config).await
    }

    pub async fn speak(&self, text: &str) -> Result<Bytes, ProviderFailure> {
        let capability = self.capability()?;
        let config = self.tts.as_ref().ok_or_else(|| {
            ProviderFailure::Unavailable(format!(
                "provider '{}' has no TTS configuration",
                self.provider_id
            ))
        })?;
        capability.speak(text, config).await
    }
}

/// Health report entry for the diagnostics surface.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealthReport {
    pub provider: ProviderId,
    pub health: ProviderHealth,
    pub stt_configured: bool,
    pub tts_configured: bool,
}

type HandleKey = (String, ProviderId);
type HandleSlot = Arc<Mutex<Option<Arc<ProviderHandle>>>>;

pub struct ProviderRegistry {
    credentials: Arc<dyn CredentialStore>,
    factory: Arc<dyn ProviderFactory>,
    handles: DashMap<HandleKey, HandleSlot>,
}

impl ProviderRegistry {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self::with_factory(credentials, Arc::new(VendorProviderFactory))
    }

    /// Registry with a custom capability factory (tests inject counting
    /// factories here).
    pub fn with_factory(
        credentials: Arc<dyn CredentialStore>,
        factory: Arc<dyn ProviderFactory>,
    ) -> Self {
        Self {
            credentials,
            factory,
            handles: DashMap::new(),
        }
    }

    /// Pure credential presence query; never initializes anything.
    pub fn credentials_present(&self, provider: ProviderId) -> bool {
        self.credentials.credentials_present(provider)
    }

    /// Returns the handle for `(agent_id, config.provider)`, constructing it
    /// on first use. A healthy handle is returned with no further I/O;
    /// non-healthy handles are re-initialized so a provider can recover once
    /// its credentials appear.
    pub async fn get_or_init(&self, agent_id: &str, config: &ProviderConfig) -> Arc<ProviderHandle> {
        let key = (agent_id.to_string(), config.provider);
        let slot = self
            .handles
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut guard = slot.lock().await;
        if let Some(handle) = guard.as_ref() {
            if handle.is_healthy() {
                return handle.clone();
            }
        }

        let handle = Arc::new(self.initialize(agent_id, config));
        *guard = Some(handle.clone());
        handle
    }

    fn initialize(&self, agent_id: &str, config: &ProviderConfig) -> ProviderHandle {
        let provider = config.provider;

        let Some(api_key) = self.credentials.api_key(provider) else {
            warn!(agent_id, %provider, "provider credentials missing");
            return ProviderHandle::failed(config, ProviderHealth::MissingCredentials);
        };

        match self.factory.create(config, api_key) {
            Ok(capability) => {
                debug!(agent_id, %provider, "provider handle initialized");
                ProviderHandle::healthy(config, capability)
            }
            Err(e) => {
                warn!(agent_id, %provider, error = %e, "provider construction failed");
                ProviderHandle::failed(config, ProviderHealth::Error(e.to_string()))
            }
        }
    }

    /// Health of every configured provider for an agent, without forcing
    /// initialization of providers not yet touched.
    pub fn health_snapshot(
        &self,
        agent_id: &str,
        configured: &[ProviderConfig],
    ) -> Vec<ProviderHealthReport> {
        configured
            .iter()
            .map(|config| {
                let key = (agent_id.to_string(), config.provider);
                let health = match self.handles.get(&key) {
                    Some(slot) => match slot.try_lock() {
                        Ok(guard) => guard
                            .as_ref()
                            .map(|h| h.health().clone())
                            .unwrap_or(ProviderHealth::Uninitialized),
                        // Initialization in flight counts as not yet ready.
                        Err(_) => ProviderHealth::Uninitialized,
                    },
                    None => ProviderHealth::Uninitialized,
                };
                ProviderHealthReport {
                    provider: config.provider,
                    health,
                    stt_configured: config.stt.is_some(),
                    tts_configured: config.tts.is_some(),
                }
            })
            .collect()
    }

    /// Discards all handles for an agent (used on agent re-initialization).
    pub fn drop_agent(&self, agent_id: &str) {
        self.handles.retain(|(agent, _), _| agent != agent_id);
    }

    /// Number of live handles across all agents.
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }
}
