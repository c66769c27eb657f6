//! Google Cloud speech capability (Speech-to-Text and Text-to-Speech REST APIs,
//! API-key authenticated).

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ProviderFailure, SpeechProvider, Transcript, build_http_client};
use crate::config::settings::{ProviderId, SttConfig, TtsConfig};

pub const GOOGLE_STT_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";
pub const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

const DEFAULT_LANGUAGE: &str = "en-US";

pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognizeResult>,
}

#[derive(Debug, Deserialize)]
struct RecognizeResult {
    #[serde(default)]
    alternatives: Vec<RecognizeAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognizeAlternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

impl GoogleProvider {
    pub fn new(api_key: String) -> Result<Self, ProviderFailure> {
        Ok(Self {
            client: build_http_client()?,
            api_key,
        })
    }

    fn encoding_for(mime_type: &str) -> &'static str {
        match mime_type {
            "audio/mpeg" | "audio/mp3" => "MP3",
            "audio/ogg" | "audio/webm" => "OGG_OPUS",
            "audio/flac" | "audio/x-flac" => "FLAC",
            _ => "LINEAR16",
        }
    }
}

#[async_trait]
impl SpeechProvider for GoogleProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Google
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
        config: &SttConfig,
    ) -> Result<Transcript, ProviderFailure> {
        let mut recognition_config = json!({
            "encoding": Self::encoding_for(mime_type),
            "languageCode": config.language.as_deref().unwrap_or(DEFAULT_LANGUAGE),
        });
        if let Some(rate) = config.sample_rate {
            recognition_config["sampleRateHertz"] = json!(rate);
        }
        if let Some(model) = &config.model {
            recognition_config["model"] = json!(model);
        }

        let body = json!({
            "config": recognition_config,
            "audio": { "content": BASE64.encode(audio) },
        });

        debug!(bytes = audio.len(), "google recognition request");

        let response = self
            .client
            .post(GOOGLE_STT_URL)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::Vendor(format!(
                "google recognition failed with {status}: {body}"
            )));
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| ProviderFailure::InvalidResponse(e.to_string()))?;

        let best = parsed
            .results
            .into_iter()
            .filter_map(|r| r.alternatives.into_iter().next())
            .next()
            .ok_or_else(|| {
                ProviderFailure::InvalidResponse("no recognition alternatives returned".to_string())
            })?;

        Ok(Transcript::new(best.transcript, best.confidence.unwrap_or(1.0)))
    }

    async fn speak(&self, text: &str, config: &TtsConfig) -> Result<Bytes, ProviderFailure> {
        let language = config.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);
        let mut voice = json!({ "languageCode": language });
        if let Some(name) = &config.voice {
            voice["name"] = json!(name);
        }

        let mut audio_config = json!({ "audioEncoding": "MP3" });
        if let Some(speed) = config.speed {
            audio_config["speakingRate"] = json!(speed);
        }
        if let Some(rate) = config.sample_rate {
            audio_config["sampleRateHertz"] = json!(rate);
        }

        let body = json!({
            "input": { "text": text },
            "voice": voice,
            "audioConfig": audio_config,
        });

        debug!(chars = text.len(), "google synthesis request");

        let response = self
            .client
            .post(GOOGLE_TTS_URL)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::Vendor(format!(
                "google synthesis failed with {status}: {body}"
            )));
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| ProviderFailure::InvalidResponse(e.to_string()))?;

        let audio = BASE64
            .decode(parsed.audio_content)
            .map_err(|e| ProviderFailure::InvalidResponse(format!("bad audio encoding: {e}")))?;

        Ok(Bytes::from(audio))
    }
}
