use thiserror::Error;

use crate::audio::CaptureError;
use crate::services::ServiceError;
use crate::speech::SpeechError;

use super::state::TurnPhase;

/// Why a turn did not complete.  None of these are fatal; the conversation
/// is back in the ready state and the user may retry.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TurnError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(#[source] ServiceError),

    #[error("reply generation failed: {0}")]
    ReplyGenerationFailed(#[source] ServiceError),

    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(#[source] SpeechError),

    /// A turn is already in flight.
    #[error("busy: {}", .0.label())]
    Busy(TurnPhase),

    /// No language has been chosen yet.
    #[error("no conversation language selected")]
    NoLanguage,

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The conversation language is fixed once chosen.
    #[error("conversation already started in {0}")]
    AlreadyStarted(String),
}

impl From<CaptureError> for TurnError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::PermissionDenied => TurnError::PermissionDenied,
            CaptureError::DeviceUnavailable(msg) => TurnError::DeviceUnavailable(msg),
        }
    }
}

/// How a turn that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The reply was appended and spoken.
    Completed { reply: String },
    /// The listening window closed before the user spoke.
    NoSpeech,
    /// Nothing was heard or typed; no message was appended.
    EmptyTranscript,
}
