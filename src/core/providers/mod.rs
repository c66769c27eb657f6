//! Speech provider capabilities.
//!
//! Each supported vendor implements [`SpeechProvider`], the closed polymorphic
//! capability interface the orchestration engine drives. Adding a vendor means
//! adding a [`ProviderId`](crate::config::settings::ProviderId) variant and a
//! module here; the orchestrator never changes.

pub mod credentials;
pub mod google;
pub mod openai;
pub mod yandex;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::settings::{ProviderConfig, ProviderId, SttConfig, TtsConfig};
use crate::errors::ErrorKind;

pub use credentials::{CredentialStore, EnvCredentials, StaticCredentials};
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
pub use yandex::YandexProvider;

/// Connect/read timeout applied to the shared vendor HTTP client. Per-attempt
/// deadlines are enforced separately by the fallback orchestrator.
pub(crate) const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

/// Transcription result returned by a provider capability.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// Confidence score in [0, 1]; vendors that do not report one get 1.0.
    pub confidence: f32,
}

impl Transcript {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Failure modes of a single provider call. All of these are non-fatal to the
/// overall request; the fallback orchestrator recovers by moving to the next
/// eligible provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderFailure {
    /// Credentials absent or the handle was constructed in a failed state.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The vendor rejected or failed the call.
    #[error("provider error: {0}")]
    Vendor(String),

    /// Transport-level failure before a vendor response was obtained.
    #[error("network error: {0}")]
    Network(String),

    /// The vendor responded with something we could not interpret.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderFailure::Unavailable(_) => ErrorKind::ProviderUnavailable,
            _ => ErrorKind::ProviderError,
        }
    }
}

impl From<reqwest::Error> for ProviderFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            ProviderFailure::Network(err.to_string())
        } else {
            ProviderFailure::Vendor(err.to_string())
        }
    }
}

/// Capability interface implemented by every speech vendor.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Transcribes an audio payload.
    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
        config: &SttConfig,
    ) -> Result<Transcript, ProviderFailure>;

    /// Synthesizes speech for a text reply.
    async fn speak(&self, text: &str, config: &TtsConfig) -> Result<Bytes, ProviderFailure>;
}

/// Constructs provider capabilities. The registry goes through this seam so
/// tests can substitute counting/mock factories.
pub trait ProviderFactory: Send + Sync {
    fn create(
        &self,
        config: &ProviderConfig,
        api_key: String,
    ) -> Result<Arc<dyn SpeechProvider>, ProviderFailure>;
}

/// Production factory building real vendor clients.
#[derive(Debug, Default)]
pub struct VendorProviderFactory;

impl ProviderFactory for VendorProviderFactory {
    fn create(
        &self,
        config: &ProviderConfig,
        api_key: String,
    ) -> Result<Arc<dyn SpeechProvider>, ProviderFailure> {
        match config.provider {
            ProviderId::Openai => Ok(Arc::new(OpenAiProvider::new(api_key)?)),
            ProviderId::Google => Ok(Arc::new(GoogleProvider::new(api_key)?)),
            ProviderId::Yandex => Ok(Arc::new(YandexProvider::new(api_key)?)),
        }
    }
}

/// Builds the shared HTTP client used by vendor provider implementations.
pub(crate) fn build_http_client() -> Result<reqwest::Client, ProviderFailure> {
    reqwest::Client::builder()
        .timeout(HTTP_CLIENT_TIMEOUT)
        .build()
        .map_err(|e| ProviderFailure::Unavailable(format!("failed to build HTTP client: {e}")))
}
