//! Engine facade.
//!
//! [`VoiceOrchestrator`] owns every subsystem (agent settings, provider
//! registry, cache, rate limiter, metrics, audio object store) and exposes
//! the operations the HTTP layer calls. Handlers never reach around it to
//! touch a subsystem directly.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::config::settings::{ProviderConfig, ProviderId, VoiceSettings};
use crate::config::validation::{ConfigValidator, ValidationReport};
use crate::core::blob::{MemoryObjectStore, ObjectStore, StoredObject};
use crate::core::cache::{CacheStats, TranscriptCache};
use crate::core::fallback::{AttemptOutcome, FallbackOrchestrator};
use crate::core::intent::{IntentDetector, IntentResult};
use crate::core::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::core::providers::{CredentialStore, EnvCredentials, ProviderFactory};
use crate::core::rate_limit::{Admission, RateLimiter};
use crate::core::registry::{ProviderHealthReport, ProviderRegistry};
use crate::errors::app_error::{VoiceError, VoiceResult};

/// Audio MIME types accepted for transcription.
const SUPPORTED_AUDIO_TYPES: &[&str] = &[
    "audio/wav",
    "audio/x-wav",
    "audio/wave",
    "audio/mpeg",
    "audio/mp3",
    "audio/ogg",
    "audio/webm",
    "audio/flac",
    "audio/x-flac",
];

/// Synthesized audio is MP3 across all vendors.
const SYNTHESIS_CONTENT_TYPE: &str = "audio/mpeg";

/// Shape of the processed audio payload, echoed back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub size_bytes: u64,
    pub mime_type: String,
}

/// Result of processing one voice input.
#[derive(Debug, Clone, Serialize)]
pub struct SttProcessResponse {
    pub success: bool,
    pub text: String,
    pub confidence: f32,
    pub provider_used: ProviderId,
    pub processing_time_ms: u64,
    pub file_info: FileInfo,
    pub cached: bool,
    pub attempts: Vec<AttemptOutcome>,
}

/// Result of synthesizing one reply.
#[derive(Debug, Clone, Serialize)]
pub struct TtsSynthesisResponse {
    pub success: bool,
    pub audio_url: String,
    pub provider_used: ProviderId,
    pub processing_time_ms: u64,
    pub file_info: StoredObject,
    pub attempts: Vec<AttemptOutcome>,
}

/// Engine-wide readiness served on the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub agents: usize,
    pub provider_handles: usize,
    pub active_rate_windows: usize,
    /// Per-agent provider health, keyed by agent id.
    pub providers: BTreeMap<String, Vec<ProviderHealthReport>>,
}

/// Combined per-agent metrics served on the metrics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AgentMetrics {
    pub agent_id: String,
    #[serde(flatten)]
    pub counters: MetricsSnapshot,
    /// Transcript cache totals across all agents. The per-agent hit count is
    /// `stt_cache_hits` in the flattened counters.
    pub cache_global: CacheStats,
}

pub struct VoiceOrchestrator {
    server: ServerConfig,
    credentials: Arc<dyn CredentialStore>,
    agents: DashMap<String, Arc<VoiceSettings>>,
    fallback: FallbackOrchestrator,
    cache: TranscriptCache,
    rate_limiter: RateLimiter,
    metrics: MetricsRegistry,
    store: Arc<dyn ObjectStore>,
}

impl VoiceOrchestrator {
    /// Production engine: environment credentials, real vendor clients, and
    /// an in-memory audio store minting URLs under the public base URL.
    pub fn new(server: ServerConfig) -> Self {
        let credentials: Arc<dyn CredentialStore> = Arc::new(EnvCredentials);
        let store = MemoryObjectStore::new(server.public_base_url.clone());
        let registry = Arc::new(ProviderRegistry::new(credentials.clone()));
        Self::assemble(server, credentials, registry, store)
    }

    /// Engine with injected seams, used by tests.
    pub fn with_parts(
        server: ServerConfig,
        credentials: Arc<dyn CredentialStore>,
        factory: Arc<dyn ProviderFactory>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let registry = Arc::new(ProviderRegistry::with_factory(credentials.clone(), factory));
        Self::assemble(server, credentials, registry, store)
    }

    fn assemble(
        server: ServerConfig,
        credentials: Arc<dyn CredentialStore>,
        registry: Arc<ProviderRegistry>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let cache = TranscriptCache::new(server.cache_max_entries);
        Self {
            server,
            credentials,
            agents: DashMap::new(),
            fallback: FallbackOrchestrator::new(registry),
            cache,
            rate_limiter: RateLimiter::new(),
            metrics: MetricsRegistry::new(),
            store,
        }
    }

    /// Validates a raw configuration without touching any agent state.
    pub fn validate_config(&self, raw: &Value) -> ValidationReport {
        ConfigValidator::validate(raw, self.credentials.as_ref())
    }

    /// Validates and installs an agent's voice configuration. Existing
    /// provider handles for the agent are discarded so the new configuration
    /// takes effect immediately.
    pub fn initialize_agent(&self, agent_id: &str, raw: &Value) -> VoiceResult<ValidationReport> {
        let report = self.validate_config(raw);
        if !report.valid {
            return Err(VoiceError::ConfigInvalid {
                errors: report.errors.clone(),
            });
        }

        let settings = report
            .settings
            .clone()
            .ok_or_else(|| VoiceError::ConfigInvalid {
                errors: vec!["validation produced no settings".to_string()],
            })?;

        info!(
            agent_id,
            providers = settings.providers.len(),
            enabled = settings.enabled,
            "agent voice configuration installed"
        );

        self.agents.insert(agent_id.to_string(), Arc::new(settings));
        self.fallback.registry().drop_agent(agent_id);
        Ok(report)
    }

    /// Current settings for an agent.
    pub fn settings(&self, agent_id: &str) -> VoiceResult<Arc<VoiceSettings>> {
        self.agents
            .get(agent_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| VoiceError::UnknownAgent(agent_id.to_string()))
    }

    /// Transcribes an incoming audio payload through the agent's provider
    /// chain, honoring rate limits, size/format gates, and the cache.
    pub async fn process_voice_input(
        &self,
        agent_id: &str,
        user_id: &str,
        audio: Bytes,
        mime_type: &str,
        explicit_provider: Option<ProviderId>,
        language_override: Option<&str>,
    ) -> VoiceResult<SttProcessResponse> {
        let started = std::time::Instant::now();
        let settings = self.enabled_settings(agent_id)?;
        self.admit(agent_id, user_id, settings.rate_limit_per_minute)?;

        let limit_bytes = settings.max_file_size_bytes();
        if audio.len() as u64 > limit_bytes {
            return Err(VoiceError::FileTooLarge {
                size_bytes: audio.len() as u64,
                limit_bytes,
            });
        }
        if !SUPPORTED_AUDIO_TYPES.contains(&mime_type) {
            return Err(VoiceError::UnsupportedFormat(mime_type.to_string()));
        }

        self.metrics.record_stt_request(agent_id);

        let mut chain = self.chain_for(&settings, explicit_provider)?;
        if let Some(language) = language_override {
            for config in &mut chain {
                if let Some(stt) = &mut config.stt {
                    stt.language = Some(language.to_string());
                }
            }
        }
        // The cache key provider component is the provider the request is
        // aimed at, not whichever one ends up serving it after fallback.
        let target = explicit_provider
            .or_else(|| settings.primary_provider())
            .ok_or_else(|| VoiceError::ConfigInvalid {
                errors: vec!["agent has no providers configured".to_string()],
            })?;
        let fingerprint = TranscriptCache::fingerprint(audio.len(), mime_type, target);

        let file_info = FileInfo {
            size_bytes: audio.len() as u64,
            mime_type: mime_type.to_string(),
        };

        if settings.cache_enabled {
            if let Some(hit) = self.cache.lookup(agent_id, fingerprint).await {
                self.metrics.record_stt_cache_hit(agent_id);
                return Ok(SttProcessResponse {
                    success: true,
                    text: hit.text,
                    confidence: hit.confidence,
                    provider_used: target,
                    processing_time_ms: started.elapsed().as_millis() as u64,
                    file_info,
                    cached: true,
                    attempts: Vec::new(),
                });
            }
        }

        let outcome = match self
            .fallback
            .transcribe(agent_id, &chain, &audio, mime_type)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics.record_stt_failure(agent_id);
                return Err(e);
            }
        };

        if settings.cache_enabled {
            let ttl = Duration::from_secs(u64::from(settings.cache_ttl_hours) * 3600);
            self.cache
                .store(agent_id, fingerprint, outcome.text.clone(), outcome.confidence, ttl)
                .await;
        }

        Ok(SttProcessResponse {
            success: true,
            text: outcome.text,
            confidence: outcome.confidence,
            provider_used: outcome.provider_used,
            processing_time_ms: started.elapsed().as_millis() as u64,
            file_info,
            cached: false,
            attempts: outcome.attempts,
        })
    }

    /// Synthesizes a reply through the agent's provider chain and stores the
    /// audio, returning a retrieval URL instead of inline bytes.
    pub async fn synthesize_response(
        &self,
        agent_id: &str,
        user_id: &str,
        text: &str,
        explicit_provider: Option<ProviderId>,
        voice_override: Option<&str>,
        language_override: Option<&str>,
    ) -> VoiceResult<TtsSynthesisResponse> {
        let started = std::time::Instant::now();
        if text.is_empty() {
            return Err(VoiceError::BadRequest("text must not be empty".to_string()));
        }

        let settings = self.enabled_settings(agent_id)?;
        self.admit(agent_id, user_id, settings.rate_limit_per_minute)?;
        self.metrics.record_tts_request(agent_id);

        let mut chain = self.chain_for(&settings, explicit_provider)?;
        if voice_override.is_some() || language_override.is_some() {
            for config in &mut chain {
                if let Some(tts) = &mut config.tts {
                    if let Some(voice) = voice_override {
                        tts.voice = Some(voice.to_string());
                    }
                    if let Some(language) = language_override {
                        tts.language = Some(language.to_string());
                    }
                }
            }
        }
        let outcome = match self.fallback.synthesize(agent_id, &chain, text).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics.record_tts_failure(agent_id);
                return Err(e);
            }
        };

        let object = self.store.put(outcome.audio, SYNTHESIS_CONTENT_TYPE);
        Ok(TtsSynthesisResponse {
            success: true,
            audio_url: object.url.clone(),
            provider_used: outcome.provider_used,
            processing_time_ms: started.elapsed().as_millis() as u64,
            file_info: object,
            attempts: outcome.attempts,
        })
    }

    /// Engine-wide readiness: counts plus every agent's provider health.
    pub fn status(&self) -> EngineStatus {
        let providers = self
            .agents
            .iter()
            .map(|entry| {
                let reports = self
                    .fallback
                    .registry()
                    .health_snapshot(entry.key(), &entry.value().providers);
                (entry.key().clone(), reports)
            })
            .collect();
        EngineStatus {
            agents: self.agents.len(),
            provider_handles: self.fallback.registry().handle_count(),
            active_rate_windows: self.rate_limiter.active_windows(),
            providers,
        }
    }

    /// Decides whether a generated reply should be spoken.
    pub fn should_voice(&self, agent_id: &str, text: &str) -> VoiceResult<IntentResult> {
        let settings = self.settings(agent_id)?;
        self.metrics.record_intent_check(agent_id);
        if !settings.enabled {
            // Disabled agents never voice, whatever their intent mode says.
            return Ok(IntentResult {
                should_voice: false,
                matched_keywords: Vec::new(),
                confidence: 0.0,
                mode: settings.intent_detection_mode,
            });
        }
        Ok(IntentDetector::detect(text, &settings))
    }

    /// Provider health for every provider the agent has configured.
    pub fn provider_health(&self, agent_id: &str) -> VoiceResult<Vec<ProviderHealthReport>> {
        let settings = self.settings(agent_id)?;
        Ok(self
            .fallback
            .registry()
            .health_snapshot(agent_id, &settings.providers))
    }

    /// Per-agent counters plus engine-wide cache totals.
    pub fn agent_metrics(&self, agent_id: &str) -> VoiceResult<AgentMetrics> {
        self.settings(agent_id)?;
        Ok(AgentMetrics {
            agent_id: agent_id.to_string(),
            counters: self.metrics.snapshot(agent_id),
            cache_global: self.cache.stats(),
        })
    }

    /// Current rate-limit window usage without consuming a slot.
    pub fn rate_limit_status(&self, agent_id: &str, user_id: &str) -> VoiceResult<Admission> {
        let settings = self.settings(agent_id)?;
        Ok(self
            .rate_limiter
            .snapshot(agent_id, user_id, settings.rate_limit_per_minute))
    }

    /// Drops every cached transcript belonging to an agent.
    pub fn purge_cache(&self, agent_id: &str) -> VoiceResult<()> {
        self.settings(agent_id)?;
        self.cache.purge_agent(agent_id);
        info!(agent_id, "transcript cache purged");
        Ok(())
    }

    /// Retrieves a stored synthesized audio file.
    pub fn stored_file(&self, file_id: &str) -> VoiceResult<(StoredObject, Bytes)> {
        self.store
            .get(file_id)
            .ok_or_else(|| VoiceError::UnknownFile(file_id.to_string()))
    }

    /// Settings lookup for voice operations. An agent that never initialized
    /// is a 503 here (the engine is not ready for it), unlike the plain
    /// lookup endpoints where it is a 404.
    fn enabled_settings(&self, agent_id: &str) -> VoiceResult<Arc<VoiceSettings>> {
        let settings = self
            .agents
            .get(agent_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| VoiceError::OrchestratorNotInitialized(agent_id.to_string()))?;
        if !settings.enabled {
            return Err(VoiceError::BadRequest(format!(
                "voice is disabled for agent '{agent_id}'"
            )));
        }
        Ok(settings)
    }

    /// Applies the admission decision, honoring the fail-open policy when the
    /// limiter store cannot decide.
    fn admit(&self, agent_id: &str, user_id: &str, limit: u32) -> VoiceResult<()> {
        match self
            .rate_limiter
            .check_and_increment(agent_id, user_id, limit)
        {
            Ok(admission) if admission.admitted => Ok(()),
            Ok(admission) => {
                self.metrics.record_rate_limit_rejection(agent_id);
                Err(VoiceError::RateLimitExceeded { admission })
            }
            Err(e) if self.server.rate_limit_fail_open => {
                warn!(agent_id, user_id, error = %e, "rate limiter unavailable, admitting");
                Ok(())
            }
            Err(e) => {
                warn!(agent_id, user_id, error = %e, "rate limiter unavailable, rejecting");
                Err(VoiceError::RateLimitExceeded {
                    admission: Admission {
                        admitted: false,
                        current_requests: 0,
                        limit,
                        remaining: 0,
                        reset_time: Utc::now(),
                    },
                })
            }
        }
    }

    fn chain_for(
        &self,
        settings: &VoiceSettings,
        explicit: Option<ProviderId>,
    ) -> VoiceResult<Vec<ProviderConfig>> {
        match explicit {
            Some(provider) => {
                let config = settings.provider_config(provider).ok_or_else(|| {
                    VoiceError::BadRequest(format!(
                        "provider '{provider}' is not configured for this agent"
                    ))
                })?;
                Ok(vec![config.clone()])
            }
            None => Ok(settings.providers_by_priority()),
        }
    }
}
