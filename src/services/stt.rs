//! Speech-to-text service binding.
//!
//! [`HttpSpeechToText`] uploads the captured segment as a 16-bit PCM WAV file
//! in a multipart form together with the language code and model name, and
//! reads `{"transcript": "..."}` from the response.  A missing or blank
//! transcript is not an error: the turn simply has nothing to say.

use async_trait::async_trait;
use serde::Deserialize;

use crate::audio::AudioSegment;
use crate::config::SttConfig;
use crate::services::{check_status, http_client, ServiceError, API_KEY_HEADER};

#[derive(Debug, Deserialize)]
struct TranscriptionReply {
    #[serde(default)]
    transcript: Option<String>,
}

/// Converts captured speech into text.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// `Ok(None)` when the service heard nothing intelligible.
    async fn transcribe(
        &self,
        audio: &AudioSegment,
        language_code: &str,
    ) -> Result<Option<String>, ServiceError>;
}

/// Multipart-upload transcription backend.
pub struct HttpSpeechToText {
    client: reqwest::Client,
    config: SttConfig,
}

impl HttpSpeechToText {
    pub fn from_config(config: &SttConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            config: config.clone(),
        }
    }

    fn parse_transcript(body: &str) -> Result<Option<String>, ServiceError> {
        let reply: TranscriptionReply =
            serde_json::from_str(body).map_err(|e| ServiceError::Malformed(e.to_string()))?;
        Ok(reply
            .transcript
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }
}

#[async_trait]
impl SpeechToText for HttpSpeechToText {
    async fn transcribe(
        &self,
        audio: &AudioSegment,
        language_code: &str,
    ) -> Result<Option<String>, ServiceError> {
        let wav = audio
            .to_wav()
            .map_err(|e| ServiceError::Request(format!("could not encode audio: {e}")))?;

        let file = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("language_code", language_code.to_string())
            .text("model", self.config.model.clone());

        let mut req = self.client.post(&self.config.url).multipart(form);
        if let Some(key) = self.config.api_key() {
            req = req.header(API_KEY_HEADER, key);
        }

        let response = check_status(req.send().await?).await?;
        let body = response.text().await?;
        Self::parse_transcript(&body)
    }
}
