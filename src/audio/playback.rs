//! Speech playback via `rodio`.
//!
//! [`AudioOutput`] plays one synthesized clip to completion.  The speech
//! sequencer awaits each call before requesting the next chunk, so at most one
//! clip ever holds the output device.
//!
//! [`RodioOutput`] opens the default output device per clip on the blocking
//! thread pool (`rodio::OutputStream` is not `Send`), waits for the sink to
//! drain and drops the device again before returning.

use std::io::Cursor;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink};
use thiserror::Error;

/// Errors that can occur while playing a clip.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlaybackError {
    /// No usable output device.
    #[error("audio output unavailable: {0}")]
    Device(String),

    /// The clip bytes are not a format the decoder understands.
    #[error("could not decode audio clip: {0}")]
    Decode(String),

    /// The blocking playback task failed.
    #[error("playback task failed: {0}")]
    Internal(String),
}

/// Plays audio clips to completion.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Play `clip` (an encoded WAV/MP3 file) and return once it has finished.
    async fn play(&self, clip: &[u8]) -> Result<(), PlaybackError>;
}

/// [`AudioOutput`] on the system default output device.
#[derive(Debug, Clone, Copy, Default)]
pub struct RodioOutput;

impl RodioOutput {
    pub fn new() -> Self {
        Self
    }

    fn play_blocking(clip: Vec<u8>) -> Result<(), PlaybackError> {
        let (_stream, handle) =
            OutputStream::try_default().map_err(|e| PlaybackError::Device(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| PlaybackError::Device(e.to_string()))?;
        let source =
            Decoder::new(Cursor::new(clip)).map_err(|e| PlaybackError::Decode(e.to_string()))?;
        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }
}

#[async_trait]
impl AudioOutput for RodioOutput {
    async fn play(&self, clip: &[u8]) -> Result<(), PlaybackError> {
        if clip.is_empty() {
            return Ok(());
        }
        let clip = clip.to_vec();
        tokio::task::spawn_blocking(move || Self::play_blocking(clip))
            .await
            .map_err(|e| PlaybackError::Internal(e.to_string()))?
    }
}
