//! Text-to-speech service binding.
//!
//! [`HttpTextToSpeech`] sends one chunk per request:
//!
//! ```json
//! { "inputs": ["<chunk>"], "target_language_code": "hi-IN",
//!   "speaker": "meera", "pace": 1.0, "loudness": 1.0 }
//! ```
//!
//! and expects `{"audios": ["<base64 WAV>"]}`.  The first entry is decoded
//! into a [`SynthesizedAudio`].

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::TtsConfig;
use crate::services::{check_status, http_client, ServiceError, API_KEY_HEADER};

/// Encoded audio (WAV) for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    inputs: [&'a str; 1],
    target_language_code: &'a str,
    speaker: &'a str,
    pace: f32,
    loudness: f32,
}

#[derive(Debug, Deserialize)]
struct SynthesisReply {
    #[serde(default)]
    audios: Vec<String>,
}

/// Converts a text chunk into speech audio.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<SynthesizedAudio, ServiceError>;
}

/// JSON-over-HTTP synthesis backend returning base64 audio.
pub struct HttpTextToSpeech {
    client: reqwest::Client,
    config: TtsConfig,
}

impl HttpTextToSpeech {
    pub fn from_config(config: &TtsConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            config: config.clone(),
        }
    }

    fn parse_audio(body: &str) -> Result<SynthesizedAudio, ServiceError> {
        let reply: SynthesisReply =
            serde_json::from_str(body).map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let encoded = reply
            .audios
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Malformed("no audio in synthesis reply".into()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| ServiceError::Malformed(format!("audio is not valid base64: {e}")))?;
        if bytes.is_empty() {
            return Err(ServiceError::Malformed("empty audio in synthesis reply".into()));
        }
        Ok(SynthesizedAudio { bytes })
    }
}

#[async_trait]
impl TextToSpeech for HttpTextToSpeech {
    async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<SynthesizedAudio, ServiceError> {
        let body = SynthesisRequest {
            inputs: [text],
            target_language_code: language_code,
            speaker: &self.config.speaker,
            pace: self.config.pace,
            loudness: self.config.loudness,
        };

        let mut req = self.client.post(&self.config.url).json(&body);
        if let Some(key) = self.config.api_key() {
            req = req.header(API_KEY_HEADER, key);
        }

        let response = check_status(req.send().await?).await?;
        let body = response.text().await?;
        Self::parse_audio(&body)
    }
}
