//! Shared test support: scripted providers and app construction.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode},
};
use bytes::Bytes;
use serde_json::Value;
use tower::util::ServiceExt;

use voxgate::config::settings::{ProviderConfig, ProviderId, SttConfig, TtsConfig};
use voxgate::core::blob::MemoryObjectStore;
use voxgate::core::orchestrator::VoiceOrchestrator;
use voxgate::core::providers::{
    ProviderFactory, ProviderFailure, SpeechProvider, StaticCredentials, Transcript,
};
use voxgate::state::AppState;
use voxgate::{ServerConfig, routes};

/// Provider that succeeds or fails according to its script.
pub struct ScriptedProvider {
    id: ProviderId,
    fail: bool,
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
        if self.fail {
            Err(ProviderFailure::Vendor("scripted failure".to_string()))
        } else {
            Ok(Transcript::new(format!("transcript from {}", self.id), 0.9))
        }
    }

    async fn speak(&self, text: &str, _config: &TtsConfig) -> Result<Bytes, ProviderFailure> {
        if self.fail {
            Err(ProviderFailure::Vendor("scripted failure".to_string()))
        } else {
            Ok(Bytes::from(format!("{}:{text}", self.id)))
        }
    }
}

pub struct ScriptedFactory {
    failing: HashMap<ProviderId, bool>,
}

impl ScriptedFactory {
    pub fn all_succeeding() -> Arc<Self> {
        Self::with_failing(&[])
    }

    pub fn with_failing(providers: &[ProviderId]) -> Arc<Self> {
        Arc::new(Self {
            failing: providers.iter().map(|p| (*p, true)).collect(),
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
        }))
    }
}

/// App wired with scripted providers and in-memory storage.
pub fn build_app(factory: Arc<ScriptedFactory>, credentialed: &[ProviderId]) -> Router {
    let config = ServerConfig {
        public_base_url: "http://localhost:3000".to_string(),
        ..ServerConfig::default()
    };
    let orchestrator = Arc::new(VoiceOrchestrator::with_parts(
        config.clone(),
        Arc::new(StaticCredentials::with_providers(credentialed)),
        factory,
        MemoryObjectStore::new(config.public_base_url.clone()),
    ));
    routes::create_app(AppState::with_orchestrator(config, orchestrator))
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    split_json(response).await
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    split_json(response).await
}

pub async fn get_raw(app: &Router, uri: &str) -> (StatusCode, Option<String>, Bytes) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, body)
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    split_json(response).await
}

pub async fn post_audio(
    app: &Router,
    uri: &str,
    mime_type: &str,
    audio: Vec<u8>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", mime_type)
        .body(Body::from(audio))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    split_json(response).await
}

async fn split_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// A minimal valid agent configuration with all three providers chained
/// yandex (1) -> openai (2) -> google (3).
pub fn full_chain_config() -> Value {
    serde_json::json!({
        "enabled": true,
        "intent_detection_mode": "keywords",
        "intent_keywords": ["speak", "озвучь"],
        "rate_limit_per_minute": 100,
        "providers": [
            { "provider": "yandex", "priority": 1,
              "stt": { "language": "ru-RU" }, "tts": { "voice": "alena" } },
            { "provider": "openai", "priority": 2,
              "stt": {}, "tts": {} },
            { "provider": "google", "priority": 3,
              "stt": { "language": "en-US" }, "tts": {} },
        ]
    })
}

pub async fn initialize_agent(app: &Router, agent_id: &str, config: Value) {
    let (status, body) = post_json(
        app,
        &format!("/v1/agents/{agent_id}/initialize"),
        config,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "initialize failed: {body}");
}
