//! Audio: microphone capture, voice-activity detection and speech playback.
//!
//! # Capture path
//!
//! ```text
//! cpal callback → downmix → MicStream.frames (mpsc)
//!              → AudioCaptureSession → VadDetector windows → AudioSegment
//! ```
//!
//! # Playback path
//!
//! ```text
//! synthesized WAV bytes → AudioOutput::play (rodio, blocking pool)
//! ```

pub mod capture;
pub mod playback;
pub mod segment;
pub mod session;
pub mod vad;

pub use capture::{downmix, CaptureError, CpalMicrophone, MicStream, Microphone};
pub use playback::{AudioOutput, PlaybackError, RodioOutput};
pub use segment::AudioSegment;
pub use session::AudioCaptureSession;
pub use vad::{AnalysedWindow, VadDetector};
