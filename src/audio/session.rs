//! One microphone capture: VAD-gated recording with a hard time limit.
//!
//! # Lifecycle
//!
//! ```text
//! begin(max) ── open microphone, arm deadline
//!   │
//!   ▼
//! next_segment(state)
//!   ├─ window voiced, not recording  → start recording   (is_recording = true)
//!   ├─ window voiced, recording      → keep buffering
//!   ├─ window quiet, recording       → stop, emit segment (is_recording = false)
//!   ├─ deadline while recording      → hard stop, emit what was captured
//!   ├─ deadline while not recording  → end, no segment
//!   └─ device stream ends            → emit if recording, else no segment
//!
//! abort(state) ── release microphone, discard buffer, no emission
//! ```
//!
//! Every exit path drops the [`MicStream`], which releases the device.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::audio::capture::{CaptureError, MicStream, Microphone};
use crate::audio::segment::AudioSegment;
use crate::audio::vad::VadDetector;
use crate::conversation::ConversationState;

enum CaptureEvent {
    Frame(Vec<f32>),
    StreamClosed,
    Deadline,
}

/// Owns the microphone while a capture is active.
pub struct AudioCaptureSession {
    microphone: Arc<dyn Microphone>,
    vad: VadDetector,
    stream: Option<MicStream>,
    buffer: Vec<f32>,
    recording: bool,
    deadline: Option<Instant>,
}

impl AudioCaptureSession {
    pub fn new(microphone: Arc<dyn Microphone>, vad: VadDetector) -> Self {
        Self {
            microphone,
            vad,
            stream: None,
            buffer: Vec::new(),
            recording: false,
            deadline: None,
        }
    }

    /// `true` while the microphone is held.
    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// `true` between a VAD start and the following stop.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Acquire the microphone and arm the `max_duration` hard stop.
    ///
    /// A capture that is already active is aborted first.
    pub async fn begin(
        &mut self,
        state: &mut ConversationState,
        max_duration: Duration,
    ) -> Result<(), CaptureError> {
        if self.is_active() {
            self.abort(state);
        }

        let stream = self.microphone.open().await?;
        log::info!(
            "capture: listening for up to {} ms at {} Hz",
            max_duration.as_millis(),
            stream.sample_rate
        );

        self.vad.reset();
        self.buffer.clear();
        self.recording = false;
        self.deadline = Some(Instant::now() + max_duration);
        self.stream = Some(stream);
        Ok(())
    }

    /// Run voice-activity detection until a segment is emitted or the
    /// capture ends without one.  The microphone is released either way.
    pub async fn next_segment(&mut self, state: &mut ConversationState) -> Option<AudioSegment> {
        loop {
            let event = {
                let Some(stream) = self.stream.as_mut() else {
                    return None;
                };
                let deadline = self.deadline.unwrap_or_else(Instant::now);
                tokio::select! {
                    frame = stream.frames.recv() => match frame {
                        Some(samples) => CaptureEvent::Frame(samples),
                        None => CaptureEvent::StreamClosed,
                    },
                    _ = tokio::time::sleep_until(deadline) => CaptureEvent::Deadline,
                }
            };

            match event {
                CaptureEvent::Frame(samples) => {
                    if let Some(segment) = self.process_frame(&samples, state) {
                        self.release();
                        return Some(segment);
                    }
                }
                CaptureEvent::Deadline => {
                    if self.recording {
                        log::info!("capture: max duration reached while recording, forcing stop");
                    } else {
                        log::info!("capture: max duration reached without speech");
                    }
                    return self.finish(state);
                }
                CaptureEvent::StreamClosed => {
                    log::warn!("capture: microphone stream ended unexpectedly");
                    return self.finish(state);
                }
            }
        }
    }

    /// Release the microphone and drop any partial recording.  Nothing is
    /// emitted.
    pub fn abort(&mut self, state: &mut ConversationState) {
        if self.is_active() || self.recording {
            log::debug!("capture: aborted ({} samples discarded)", self.buffer.len());
        }
        self.stop_recording(state);
        self.buffer.clear();
        self.vad.reset();
        self.release();
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn process_frame(
        &mut self,
        samples: &[f32],
        state: &mut ConversationState,
    ) -> Option<AudioSegment> {
        for window in self.vad.feed(samples) {
            match (self.recording, window.voiced) {
                (false, true) => {
                    if !state.set_recording(true) {
                        continue;
                    }
                    log::debug!("capture: speech started (level {:.4})", window.level);
                    self.recording = true;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(&window.samples);
                }
                (true, true) => self.buffer.extend_from_slice(&window.samples),
                (true, false) => {
                    log::debug!("capture: speech stopped (level {:.4})", window.level);
                    return self.take_segment(state);
                }
                (false, false) => {}
            }
        }
        None
    }

    /// Hard stop / stream end: emit whatever was recorded, then release.
    fn finish(&mut self, state: &mut ConversationState) -> Option<AudioSegment> {
        let segment = if self.recording {
            let tail = self.vad.take_pending();
            self.buffer.extend_from_slice(&tail);
            self.take_segment(state)
        } else {
            None
        };
        self.vad.reset();
        self.release();
        segment
    }

    fn take_segment(&mut self, state: &mut ConversationState) -> Option<AudioSegment> {
        self.stop_recording(state);
        let samples = std::mem::take(&mut self.buffer);
        if samples.is_empty() {
            return None;
        }
        let sample_rate = self.stream.as_ref().map(|s| s.sample_rate).unwrap_or_default();
        let segment = AudioSegment::new(samples, sample_rate);
        log::info!(
            "capture: emitted segment of {} ms",
            segment.duration().as_millis()
        );
        Some(segment)
    }

    fn stop_recording(&mut self, state: &mut ConversationState) {
        if self.recording {
            self.recording = false;
            state.set_recording(false);
        }
    }

    fn release(&mut self) {
        self.deadline = None;
        if let Some(stream) = self.stream.take() {
            stream.close();
        }
    }
}

impl Drop for AudioCaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{loud, quiet, ScriptedMicrophone};

    const WINDOW: usize = 4;

    fn session(mic: &Arc<ScriptedMicrophone>) -> AudioCaptureSession {
        AudioCaptureSession::new(mic.clone(), VadDetector::new(0.02, WINDOW))
    }

    #[tokio::test]
    async fn begin_failure_propagates_permission_denied() {
        let mic = Arc::new(ScriptedMicrophone::failing(CaptureError::PermissionDenied));
        let mut s = session(&mic);
        let mut state = ConversationState::default();
        let err = s
            .begin(&mut state, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, CaptureError::PermissionDenied);
        assert!(!s.is_active());
    }

    #[tokio::test]
    async fn speech_then_silence_emits_voiced_windows() {
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![
            quiet(WINDOW),
            loud(WINDOW),
            loud(WINDOW),
            quiet(WINDOW),
        ]));
        let mut s = session(&mic);
        let mut state = ConversationState::default();

        s.begin(&mut state, Duration::from_secs(5)).await.unwrap();
        let segment = s.next_segment(&mut state).await.expect("segment");

        assert_eq!(segment.len(), 2 * WINDOW);
        assert_eq!(segment.sample_rate(), 16_000);
        assert!(!state.is_recording());
        assert!(!s.is_active());
        assert!(mic.released());
    }

    #[tokio::test]
    async fn is_recording_toggles_once_per_transition() {
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![
            loud(WINDOW),
            loud(WINDOW),
            loud(WINDOW),
            quiet(WINDOW),
        ]));
        let mut s = session(&mic);
        let mut state = ConversationState::default();
        let mut rx = state.subscribe();

        s.begin(&mut state, Duration::from_secs(5)).await.unwrap();
        s.next_segment(&mut state).await.expect("segment");

        let mut flips = Vec::new();
        while let Ok(snapshot) = rx.try_recv() {
            flips.push(snapshot.is_recording);
        }
        assert_eq!(flips, vec![true, false]);
    }

    #[tokio::test]
    async fn hard_stop_emits_non_empty_segment_while_still_loud() {
        // Loud frames only; the stream stays open so only the deadline ends it.
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![loud(WINDOW); 3]));
        let mut s = session(&mic);
        let mut state = ConversationState::default();

        s.begin(&mut state, Duration::from_millis(50)).await.unwrap();
        let segment = s.next_segment(&mut state).await.expect("forced segment");

        assert_eq!(segment.len(), 3 * WINDOW);
        assert!(!state.is_recording());
        assert!(mic.released());
    }

    #[tokio::test]
    async fn hard_stop_includes_partial_window() {
        let mut frames = vec![loud(WINDOW)];
        frames.push(loud(WINDOW / 2));
        let mic = Arc::new(ScriptedMicrophone::with_frames(frames));
        let mut s = session(&mic);
        let mut state = ConversationState::default();

        s.begin(&mut state, Duration::from_millis(50)).await.unwrap();
        let segment = s.next_segment(&mut state).await.expect("forced segment");
        assert_eq!(segment.len(), WINDOW + WINDOW / 2);
    }

    #[tokio::test]
    async fn deadline_without_speech_emits_nothing() {
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![quiet(WINDOW); 4]));
        let mut s = session(&mic);
        let mut state = ConversationState::default();

        s.begin(&mut state, Duration::from_millis(30)).await.unwrap();
        assert!(s.next_segment(&mut state).await.is_none());
        assert!(!state.is_recording());
        assert!(mic.released());
    }

    #[tokio::test]
    async fn stream_end_while_recording_emits_segment() {
        let mic = Arc::new(
            ScriptedMicrophone::with_frames(vec![loud(WINDOW), loud(WINDOW)])
                .closing_after_script(),
        );
        let mut s = session(&mic);
        let mut state = ConversationState::default();

        s.begin(&mut state, Duration::from_secs(5)).await.unwrap();
        let segment = s.next_segment(&mut state).await.expect("segment");
        assert_eq!(segment.len(), 2 * WINDOW);
    }

    #[tokio::test]
    async fn abort_discards_and_releases() {
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![loud(WINDOW)]));
        let mut s = session(&mic);
        let mut state = ConversationState::default();

        s.begin(&mut state, Duration::from_secs(5)).await.unwrap();
        // Feed the loud window by hand so recording is in progress.
        assert!(s.process_frame(&loud(WINDOW), &mut state).is_none());
        assert!(state.is_recording());

        s.abort(&mut state);

        assert!(!state.is_recording());
        assert!(!s.is_active());
        assert!(mic.released());
        assert!(s.next_segment(&mut state).await.is_none());
    }

    #[tokio::test]
    async fn recording_not_started_while_speech_plays() {
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![loud(WINDOW), quiet(WINDOW)]));
        let mut s = session(&mic);
        let mut state = ConversationState::default();
        state.set_playing_speech(true);

        s.begin(&mut state, Duration::from_millis(30)).await.unwrap();
        assert!(s.next_segment(&mut state).await.is_none());
        assert!(!state.is_recording());
    }

    #[tokio::test]
    async fn drop_releases_microphone() {
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![]));
        let mut state = ConversationState::default();
        {
            let mut s = session(&mic);
            s.begin(&mut state, Duration::from_secs(5)).await.unwrap();
            assert!(!mic.released());
        }
        assert!(mic.released());
    }
}
