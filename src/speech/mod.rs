//! Spoken replies: sentence chunking and strictly sequential playback.

pub mod chunker;
pub mod sequencer;

use thiserror::Error;

use crate::audio::PlaybackError;
use crate::services::ServiceError;

pub use chunker::{chunk_text, split_sentences, MAX_CHUNK_CHARS};
pub use sequencer::SpeechPlaybackSequencer;

/// Why a reply could not be spoken to the end.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpeechError {
    #[error("synthesis of chunk {index} failed: {source}")]
    Synthesis {
        index: usize,
        #[source]
        source: ServiceError,
    },

    #[error("playback of chunk {index} failed: {source}")]
    Playback {
        index: usize,
        #[source]
        source: PlaybackError,
    },

    #[error("speech refused while the microphone is still recording")]
    CaptureActive,
}
