//! Yandex SpeechKit capability (short-audio recognition and synthesis REST
//! APIs, Api-Key authenticated).

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;

use super::{ProviderFailure, SpeechProvider, Transcript, build_http_client};
use crate::config::settings::{ProviderId, SttConfig, TtsConfig};

pub const YANDEX_STT_URL: &str = "https://stt.api.cloud.yandex.net/speech/v1/stt:recognize";
pub const YANDEX_TTS_URL: &str = "https://tts.api.cloud.yandex.net/speech/v1/tts:synthesize";

const DEFAULT_LANGUAGE: &str = "ru-RU";
const DEFAULT_VOICE: &str = "alena";

pub struct YandexProvider {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    result: String,
}

impl YandexProvider {
    pub fn new(api_key: String) -> Result<Self, ProviderFailure> {
        Ok(Self {
            client: build_http_client()?,
            api_key,
        })
    }

    fn format_for(mime_type: &str) -> &'static str {
        match mime_type {
            "audio/ogg" | "audio/webm" => "oggopus",
            _ => "lpcm",
        }
    }

    fn auth_header(&self) -> String {
        format!("Api-Key {}", self.api_key)
    }
}

#[async_trait]
impl SpeechProvider for YandexProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Yandex
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
        config: &SttConfig,
    ) -> Result<Transcript, ProviderFailure> {
        let mut query: Vec<(&str, String)> = vec![
            (
                "lang",
                config
                    .language
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            ),
            ("format", Self::format_for(mime_type).to_string()),
        ];
        if let Some(rate) = config.sample_rate {
            query.push(("sampleRateHertz", rate.to_string()));
        }

        debug!(bytes = audio.len(), "yandex recognition request");

        let response = self
            .client
            .post(YANDEX_STT_URL)
            .header("Authorization", self.auth_header())
            .query(&query)
            .body(audio.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::Vendor(format!(
                "yandex recognition failed with {status}: {body}"
            )));
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| ProviderFailure::InvalidResponse(e.to_string()))?;

        // SpeechKit's short-audio API does not report a confidence score.
        Ok(Transcript::new(parsed.result, 1.0))
    }

    async fn speak(&self, text: &str, config: &TtsConfig) -> Result<Bytes, ProviderFailure> {
        let mut form: Vec<(&str, String)> = vec![
            ("text", text.to_string()),
            (
                "lang",
                config
                    .language
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            ),
            (
                "voice",
                config
                    .voice
                    .clone()
                    .unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            ),
            ("format", "mp3".to_string()),
        ];
        if let Some(speed) = config.speed {
            form.push(("speed", speed.to_string()));
        }

        debug!(chars = text.len(), "yandex synthesis request");

        let response = self
            .client
            .post(YANDEX_TTS_URL)
            .header("Authorization", self.auth_header())
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::Vendor(format!(
                "yandex synthesis failed with {status}: {body}"
            )));
        }

        Ok(response.bytes().await?)
    }
}
