//! Remote collaborators: chat replies, speech-to-text and text-to-speech.
//!
//! This module provides:
//! * [`ChatService`] / [`HttpChatService`]: one reply per user turn.
//! * [`SpeechToText`] / [`HttpSpeechToText`]: transcript for a captured segment.
//! * [`TextToSpeech`] / [`HttpTextToSpeech`]: synthesized audio per chunk.
//! * [`ServiceError`]: transport and payload failures shared by all three.
//!
//! Every response is decoded into a typed payload at the boundary; a body
//! without the required fields is reported as [`ServiceError::Malformed`]
//! instead of being passed inward.

pub mod chat;
pub mod stt;
pub mod tts;

use thiserror::Error;

pub use chat::{ChatRequest, ChatService, HttpChatService};
pub use stt::{HttpSpeechToText, SpeechToText};
pub use tts::{HttpTextToSpeech, SynthesizedAudio, TextToSpeech};

/// Header carrying the API key on every request.
pub(crate) const API_KEY_HEADER: &str = "api-subscription-key";

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// Errors that can occur while calling a remote service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body is missing required fields or cannot be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ServiceError::Timeout
        } else if e.is_decode() {
            ServiceError::Malformed(e.to_string())
        } else {
            ServiceError::Request(e.to_string())
        }
    }
}

/// Build a client with the per-request timeout.  Falls back to a default
/// client if the builder fails.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Turn a non-success response into [`ServiceError::Status`].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}
