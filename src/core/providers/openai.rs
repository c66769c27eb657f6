//! OpenAI speech capability (Whisper transcription + speech synthesis REST APIs).

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ProviderFailure, SpeechProvider, Transcript, build_http_client};
use crate::config::settings::{ProviderId, SttConfig, TtsConfig};

pub const OPENAI_STT_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
pub const OPENAI_TTS_URL: &str = "https://api.openai.com/v1/audio/speech";

const DEFAULT_STT_MODEL: &str = "whisper-1";
const DEFAULT_TTS_MODEL: &str = "tts-1";
const DEFAULT_TTS_VOICE: &str = "alloy";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Result<Self, ProviderFailure> {
        Ok(Self {
            client: build_http_client()?,
            api_key,
        })
    }

    fn file_name_for(mime_type: &str) -> &'static str {
        match mime_type {
            "audio/mpeg" | "audio/mp3" => "audio.mp3",
            "audio/ogg" => "audio.ogg",
            "audio/webm" => "audio.webm",
            "audio/flac" | "audio/x-flac" => "audio.flac",
            _ => "audio.wav",
        }
    }
}

#[async_trait]
impl SpeechProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Openai
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
        config: &SttConfig,
    ) -> Result<Transcript, ProviderFailure> {
        let model = config.model.as_deref().unwrap_or(DEFAULT_STT_MODEL);

        let part = multipart::Part::bytes(audio.to_vec())
            .file_name(Self::file_name_for(mime_type))
            .mime_str(mime_type)
            .map_err(|e| ProviderFailure::Vendor(format!("invalid mime type: {e}")))?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("model", model.to_string());
        if let Some(language) = &config.language {
            // OpenAI expects a bare ISO-639-1 code, not a BCP-47 tag.
            let code = language.split('-').next().unwrap_or(language).to_string();
            form = form.text("language", code);
        }

        debug!(model, bytes = audio.len(), "openai transcription request");

        let response = self
            .client
            .post(OPENAI_STT_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::Vendor(format!(
                "openai transcription failed with {status}: {body}"
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| ProviderFailure::InvalidResponse(e.to_string()))?;

        // Whisper does not report a confidence score.
        Ok(Transcript::new(parsed.text, 1.0))
    }

    async fn speak(&self, text: &str, config: &TtsConfig) -> Result<Bytes, ProviderFailure> {
        let mut body = json!({
            "model": config.model.as_deref().unwrap_or(DEFAULT_TTS_MODEL),
            "voice": config.voice.as_deref().unwrap_or(DEFAULT_TTS_VOICE),
            "input": text,
        });
        if let Some(speed) = config.speed {
            body["speed"] = json!(speed);
        }

        debug!(chars = text.len(), "openai synthesis request");

        let response = self
            .client
            .post(OPENAI_TTS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::Vendor(format!(
                "openai synthesis failed with {status}: {body}"
            )));
        }

        Ok(response.bytes().await?)
    }
}
