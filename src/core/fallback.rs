//! Priority-ordered provider fallback.
//!
//! Runs one operation (transcription or synthesis) across an agent's
//! configured providers in ascending priority order. Ineligible providers
//! (no configuration for the operation, or known-missing credentials) are
//! skipped without counting as attempts; eligible ones are tried one at a
//! time under a per-attempt deadline until the first success.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::settings::{ProviderConfig, ProviderId};
use crate::core::providers::ProviderFailure;
use crate::core::registry::{ProviderHealth, ProviderRegistry};
use crate::errors::app_error::{ErrorKind, VoiceError, VoiceResult};

/// Default per-attempt deadline when a provider config carries no
/// `timeout_secs` of its own.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Record of one counted provider attempt, surfaced in responses and in the
/// `ALL_PROVIDERS_FAILED` error details.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptOutcome {
    pub provider: ProviderId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub latency_ms: u64,
}

/// Successful transcription with its attempt trail.
#[derive(Debug, Clone)]
pub struct SttOutcome {
    pub text: String,
    pub confidence: f32,
    pub provider_used: ProviderId,
    pub attempts: Vec<AttemptOutcome>,
}

/// Successful synthesis with its attempt trail.
#[derive(Debug, Clone)]
pub struct TtsOutcome {
    pub audio: Bytes,
    pub provider_used: ProviderId,
    pub attempts: Vec<AttemptOutcome>,
}

enum Operation {
    Transcribe,
    Synthesize,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::Transcribe => "transcribe",
            Operation::Synthesize => "synthesize",
        }
    }

    fn configured(&self, config: &ProviderConfig) -> bool {
        match self {
            Operation::Transcribe => config.stt.is_some(),
            Operation::Synthesize => config.tts.is_some(),
        }
    }

    fn attempt_timeout(&self, config: &ProviderConfig) -> Duration {
        let secs = match self {
            Operation::Transcribe => config.stt.as_ref().and_then(|c| c.timeout_secs),
            Operation::Synthesize => config.tts.as_ref().and_then(|c| c.timeout_secs),
        };
        secs.map(Duration::from_secs)
            .unwrap_or(DEFAULT_ATTEMPT_TIMEOUT)
    }
}

pub struct FallbackOrchestrator {
    registry: Arc<ProviderRegistry>,
}

impl FallbackOrchestrator {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Transcribes audio using the first provider in the chain that succeeds.
    pub async fn transcribe(
        &self,
        agent_id: &str,
        chain: &[ProviderConfig],
        audio: &[u8],
        mime_type: &str,
    ) -> VoiceResult<SttOutcome> {
        self.run(agent_id, chain, Operation::Transcribe, |handle| async move {
            let transcript = handle.transcribe(audio, mime_type).await?;
            Ok((transcript.text, transcript.confidence))
        })
        .await
        .map(|((text, confidence), provider_used, attempts)| SttOutcome {
            text,
            confidence,
            provider_used,
            attempts,
        })
    }

    /// Synthesizes speech using the first provider in the chain that succeeds.
    pub async fn synthesize(
        &self,
        agent_id: &str,
        chain: &[ProviderConfig],
        text: &str,
    ) -> VoiceResult<TtsOutcome> {
        self.run(agent_id, chain, Operation::Synthesize, |handle| async move {
            handle.speak(text).await
        })
        .await
        .map(|(audio, provider_used, attempts)| TtsOutcome {
            audio,
            provider_used,
            attempts,
        })
    }

    async fn run<'a, T, F, Fut>(
        &'a self,
        agent_id: &'a str,
        chain: &'a [ProviderConfig],
        operation: Operation,
        call: F,
    ) -> VoiceResult<(T, ProviderId, Vec<AttemptOutcome>)>
    where
        F: Fn(Arc<crate::core::registry::ProviderHandle>) -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderFailure>> + 'a,
    {
        // Chains normally arrive pre-sorted; re-sort in case a caller passes a
        // raw configuration slice.
        let mut ordered: Vec<&ProviderConfig> = chain.iter().collect();
        ordered.sort_by_key(|c| c.priority);

        let mut attempts: Vec<AttemptOutcome> = Vec::new();

        for config in ordered {
            if !operation.configured(config) {
                debug!(
                    agent_id,
                    provider = %config.provider,
                    operation = operation.name(),
                    "provider skipped: operation not configured"
                );
                continue;
            }

            let handle = self.registry.get_or_init(agent_id, config).await;
            if *handle.health() == ProviderHealth::MissingCredentials {
                debug!(
                    agent_id,
                    provider = %config.provider,
                    "provider skipped: credentials missing"
                );
                continue;
            }

            let deadline = operation.attempt_timeout(config);
            let started = Instant::now();
            let result = timeout(deadline, call(handle)).await;
            let latency_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(Ok(value)) => {
                    attempts.push(AttemptOutcome {
                        provider: config.provider,
                        success: true,
                        error_kind: None,
                        latency_ms,
                    });
                    info!(
                        agent_id,
                        provider = %config.provider,
                        operation = operation.name(),
                        latency_ms,
                        "provider attempt succeeded"
                    );
                    return Ok((value, config.provider, attempts));
                }
                Ok(Err(failure)) => {
                    warn!(
                        agent_id,
                        provider = %config.provider,
                        operation = operation.name(),
                        latency_ms,
                        error = %failure,
                        "provider attempt failed"
                    );
                    attempts.push(AttemptOutcome {
                        provider: config.provider,
                        success: false,
                        error_kind: Some(failure.kind()),
                        latency_ms,
                    });
                }
                Err(_) => {
                    warn!(
                        agent_id,
                        provider = %config.provider,
                        operation = operation.name(),
                        deadline_secs = deadline.as_secs(),
                        "provider attempt timed out"
                    );
                    attempts.push(AttemptOutcome {
                        provider: config.provider,
                        success: false,
                        error_kind: Some(ErrorKind::ProviderTimeout),
                        latency_ms,
                    });
                }
            }

            // A failed provider with fallback disabled ends the run even if
            // further providers remain.
            if !config.fallback_enabled {
                warn!(
                    agent_id,
                    provider = %config.provider,
                    "fallback disabled after failed provider, stopping chain"
                );
                break;
            }
        }

        Err(VoiceError::AllProvidersFailed { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{SttConfig, TtsConfig};
    use crate::core::providers::{
        ProviderFactory, SpeechProvider, StaticCredentials, Transcript,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Scripted provider: fails, stalls, or succeeds per its configuration.
    struct ScriptedProvider {
        id: ProviderId,
        fail: bool,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        async fn stall(&self) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl SpeechProvider for ScriptedProvider {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn transcribe(
            &self,
            _audio: &[u8],
            _mime_type: &str,
            _config: &SttConfig,
        ) -> Result<Transcript, ProviderFailure> {
            self.stall().await;
            if self.fail {
                Err(ProviderFailure::Vendor("scripted failure".to_string()))
            } else {
                Ok(Transcript::new(format!("text from {}", self.id), 0.9))
            }
        }

        async fn speak(&self, text: &str, _config: &TtsConfig) -> Result<Bytes, ProviderFailure> {
            self.stall().await;
            if self.fail {
                Err(ProviderFailure::Vendor("scripted failure".to_string()))
            } else {
                Ok(Bytes::from(format!("{}:{text}", self.id)))
            }
        }
    }

    struct ScriptedFactory {
        failing: HashMap<ProviderId, bool>,
        delays: HashMap<ProviderId, Duration>,
    }

    impl ScriptedFactory {
        fn failing(providers: &[ProviderId]) -> Arc<Self> {
            Arc::new(Self {
                failing: providers.iter().map(|p| (*p, true)).collect(),
                delays: HashMap::new(),
            })
        }

        fn with_delay(provider: ProviderId, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                failing: HashMap::new(),
                delays: [(provider, delay)].into_iter().collect(),
            })
        }
    }

    impl ProviderFactory for ScriptedFactory {
        fn create(
            &self,
            config: &ProviderConfig,
            _api_key: String,
        ) -> Result<Arc<dyn SpeechProvider>, ProviderFailure> {
            Ok(Arc::new(ScriptedProvider {
                id: config.provider,
                fail: self.failing.get(&config.provider).copied().unwrap_or(false),
                delay: self.delays.get(&config.provider).copied(),
            }))
        }
    }

    fn orchestrator(
        factory: Arc<dyn ProviderFactory>,
        credentialed: &[ProviderId],
    ) -> FallbackOrchestrator {
        let registry = Arc::new(ProviderRegistry::with_factory(
            Arc::new(StaticCredentials::with_providers(credentialed)),
            factory,
        ));
        FallbackOrchestrator::new(registry)
    }

    fn chain_entry(id: ProviderId, priority: i32) -> ProviderConfig {
        ProviderConfig {
            provider: id,
            priority,
            fallback_enabled: true,
            stt: Some(SttConfig {
                model: None,
                language: None,
                sample_rate: None,
                timeout_secs: None,
            }),
            tts: Some(TtsConfig {
                model: None,
                voice: None,
                language: None,
                speed: None,
                sample_rate: None,
                timeout_secs: None,
            }),
            custom_settings: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn first_healthy_provider_wins() {
        let orchestrator = orchestrator(
            ScriptedFactory::failing(&[]),
            &[ProviderId::Yandex, ProviderId::Openai],
        );
        let chain = vec![
            chain_entry(ProviderId::Openai, 2),
            chain_entry(ProviderId::Yandex, 1),
        ];

        let outcome = orchestrator
            .transcribe("agent-1", &chain, b"audio", "audio/wav")
            .await
            .unwrap();

        assert_eq!(outcome.provider_used, ProviderId::Yandex);
        assert_eq!(outcome.attempts.len(), 1);
        assert!(outcome.attempts[0].success);
    }

    #[tokio::test]
    async fn failures_cascade_in_priority_order() {
        let orchestrator = orchestrator(
            ScriptedFactory::failing(&[ProviderId::Yandex, ProviderId::Openai]),
            &ProviderId::ALL,
        );
        let chain = vec![
            chain_entry(ProviderId::Google, 3),
            chain_entry(ProviderId::Yandex, 1),
            chain_entry(ProviderId::Openai, 2),
        ];

        let outcome = orchestrator
            .transcribe("agent-1", &chain, b"audio", "audio/wav")
            .await
            .unwrap();

        assert_eq!(outcome.provider_used, ProviderId::Google);
        let attempted: Vec<ProviderId> =
            outcome.attempts.iter().map(|a| a.provider).collect();
        assert_eq!(
            attempted,
            vec![ProviderId::Yandex, ProviderId::Openai, ProviderId::Google]
        );
        assert!(!outcome.attempts[0].success);
        assert!(!outcome.attempts[1].success);
        assert!(outcome.attempts[2].success);
    }

    #[tokio::test]
    async fn missing_credentials_skip_without_an_attempt() {
        let orchestrator = orchestrator(
            ScriptedFactory::failing(&[]),
            &[ProviderId::Google],
        );
        let chain = vec![
            chain_entry(ProviderId::Yandex, 1),
            chain_entry(ProviderId::Google, 2),
        ];

        let outcome = orchestrator
            .transcribe("agent-1", &chain, b"audio", "audio/wav")
            .await
            .unwrap();

        assert_eq!(outcome.provider_used, ProviderId::Google);
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_operation_skips_the_provider() {
        let orchestrator = orchestrator(ScriptedFactory::failing(&[]), &ProviderId::ALL);
        let mut no_tts = chain_entry(ProviderId::Yandex, 1);
        no_tts.tts = None;
        let chain = vec![no_tts, chain_entry(ProviderId::Openai, 2)];

        let outcome = orchestrator
            .synthesize("agent-1", &chain, "hello")
            .await
            .unwrap();

        assert_eq!(outcome.provider_used, ProviderId::Openai);
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_times_out_and_the_next_one_is_tried() {
        let orchestrator = orchestrator(
            ScriptedFactory::with_delay(ProviderId::Yandex, Duration::from_secs(120)),
            &ProviderId::ALL,
        );
        let mut slow = chain_entry(ProviderId::Yandex, 1);
        slow.stt.as_mut().unwrap().timeout_secs = Some(1);
        let chain = vec![slow, chain_entry(ProviderId::Openai, 2)];

        let outcome = orchestrator
            .transcribe("agent-1", &chain, b"audio", "audio/wav")
            .await
            .unwrap();

        assert_eq!(outcome.provider_used, ProviderId::Openai);
        assert_eq!(outcome.attempts.len(), 2);
        assert_eq!(outcome.attempts[0].provider, ProviderId::Yandex);
        assert!(!outcome.attempts[0].success);
        assert_eq!(
            outcome.attempts[0].error_kind,
            Some(ErrorKind::ProviderTimeout)
        );
        assert!(outcome.attempts[1].success);
    }

    #[tokio::test]
    async fn fallback_disabled_stops_the_chain_after_a_failure() {
        let orchestrator = orchestrator(
            ScriptedFactory::failing(&[ProviderId::Yandex]),
            &ProviderId::ALL,
        );
        let mut first = chain_entry(ProviderId::Yandex, 1);
        first.fallback_enabled = false;
        let chain = vec![first, chain_entry(ProviderId::Openai, 2)];

        let err = orchestrator
            .transcribe("agent-1", &chain, b"audio", "audio/wav")
            .await
            .unwrap_err();

        match err {
            VoiceError::AllProvidersFailed { attempts } => {
                assert_eq!(attempts.len(), 1);
                assert_eq!(attempts[0].provider, ProviderId::Yandex);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn exhausted_chain_reports_every_attempt() {
        let orchestrator = orchestrator(
            ScriptedFactory::failing(&ProviderId::ALL),
            &ProviderId::ALL,
        );
        let chain = vec![
            chain_entry(ProviderId::Openai, 1),
            chain_entry(ProviderId::Google, 2),
        ];

        let err = orchestrator
            .transcribe("agent-1", &chain, b"audio", "audio/wav")
            .await
            .unwrap_err();

        match err {
            VoiceError::AllProvidersFailed { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts.iter().all(|a| !a.success));
                assert!(attempts
                    .iter()
                    .all(|a| a.error_kind == Some(ErrorKind::ProviderError)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
