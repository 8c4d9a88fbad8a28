//! Speak a reply chunk by chunk.
//!
//! Chunk *i+1* is only synthesized after chunk *i* has finished playing, so
//! two clips never overlap and at most one synthesis request is in flight.
//! Any capture in progress is aborted before the first chunk, and
//! `is_playing_speech` stays raised from the first chunk until the last one
//! ends or a chunk fails.

use std::sync::Arc;

use crate::audio::{AudioCaptureSession, AudioOutput};
use crate::conversation::ConversationState;
use crate::services::TextToSpeech;
use crate::speech::chunker::{chunk_text, MAX_CHUNK_CHARS};
use crate::speech::SpeechError;

pub struct SpeechPlaybackSequencer {
    tts: Arc<dyn TextToSpeech>,
    output: Arc<dyn AudioOutput>,
    max_chunk_chars: usize,
}

impl SpeechPlaybackSequencer {
    pub fn new(tts: Arc<dyn TextToSpeech>, output: Arc<dyn AudioOutput>) -> Self {
        Self {
            tts,
            output,
            max_chunk_chars: MAX_CHUNK_CHARS,
        }
    }

    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars;
        self
    }

    /// Speak `text` in `language_code`.  Returns the number of chunks played.
    ///
    /// Blank text plays nothing and leaves the flags untouched.
    pub async fn play(
        &self,
        state: &mut ConversationState,
        capture: &mut AudioCaptureSession,
        language_code: &str,
        text: &str,
    ) -> Result<usize, SpeechError> {
        capture.abort(state);

        let chunks = chunk_text(text, self.max_chunk_chars);
        if chunks.is_empty() {
            log::debug!("speech: nothing to say");
            return Ok(0);
        }

        log::info!("speech: playing {} chunk(s) in {}", chunks.len(), language_code);
        if !state.set_playing_speech(true) {
            return Err(SpeechError::CaptureActive);
        }
        let result = self.play_chunks(&chunks, language_code).await;
        state.set_playing_speech(false);

        if let Err(e) = &result {
            log::warn!("speech: stopped early: {e}");
        }
        result
    }

    async fn play_chunks(
        &self,
        chunks: &[String],
        language_code: &str,
    ) -> Result<usize, SpeechError> {
        for (index, chunk) in chunks.iter().enumerate() {
            let audio = self
                .tts
                .synthesize(chunk, language_code)
                .await
                .map_err(|source| SpeechError::Synthesis { index, source })?;
            log::debug!("speech: chunk {index} synthesized ({} bytes)", audio.bytes.len());

            self.output
                .play(&audio.bytes)
                .await
                .map_err(|source| SpeechError::Playback { index, source })?;
        }
        Ok(chunks.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::audio::VadDetector;
    use crate::testing::{loud, EchoTts, EventLog, RecordingOutput, ScriptedMicrophone};

    fn capture(mic: &Arc<ScriptedMicrophone>) -> AudioCaptureSession {
        AudioCaptureSession::new(mic.clone(), VadDetector::new(0.02, 4))
    }

    fn sequencer(tts: EchoTts, output: RecordingOutput) -> SpeechPlaybackSequencer {
        SpeechPlaybackSequencer::new(Arc::new(tts), Arc::new(output)).with_max_chunk_chars(12)
    }

    #[tokio::test]
    async fn chunks_are_synthesized_only_after_previous_playback() {
        let log = EventLog::default();
        let seq = sequencer(EchoTts::new(log.clone()), RecordingOutput::new(log.clone()));
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![]));
        let mut cap = capture(&mic);
        let mut state = ConversationState::default();

        let played = seq
            .play(&mut state, &mut cap, "hi-IN", "First one. Second. Third!")
            .await
            .unwrap();

        assert_eq!(played, 3);
        assert_eq!(
            log.events(),
            vec![
                "synth:First one.",
                "play:First one.",
                "done:First one.",
                "synth:Second.",
                "play:Second.",
                "done:Second.",
                "synth:Third!",
                "play:Third!",
                "done:Third!",
            ]
        );
        assert!(!state.is_playing_speech());
    }

    #[tokio::test]
    async fn playing_flag_spans_the_whole_reply() {
        let log = EventLog::default();
        let seq = sequencer(EchoTts::new(log.clone()), RecordingOutput::new(log));
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![]));
        let mut cap = capture(&mic);
        let mut state = ConversationState::default();
        let mut rx = state.subscribe();

        seq.play(&mut state, &mut cap, "en-IN", "One. Two. Three. Four.")
            .await
            .unwrap();

        let flags: Vec<bool> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|s| s.is_playing_speech)
            .collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[tokio::test]
    async fn active_capture_is_aborted_before_first_chunk() {
        let log = EventLog::default();
        let seq = sequencer(EchoTts::new(log.clone()), RecordingOutput::new(log));
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![loud(4)]));
        let mut cap = capture(&mic);
        let mut state = ConversationState::default();

        cap.begin(&mut state, Duration::from_secs(5)).await.unwrap();
        let pending =
            tokio::time::timeout(Duration::from_millis(20), cap.next_segment(&mut state)).await;
        assert!(pending.is_err());
        assert!(state.is_recording());
        assert!(!mic.released());
        let mut rx = state.subscribe();

        seq.play(&mut state, &mut cap, "en-IN", "Hello.").await.unwrap();

        assert!(mic.released());
        assert!(!cap.is_active());
        let flags: Vec<(bool, bool)> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|s| (s.is_recording, s.is_playing_speech))
            .collect();
        assert_eq!(flags, vec![(false, false), (false, true), (false, false)]);
    }

    #[tokio::test]
    async fn refuses_to_speak_over_a_foreign_recording() {
        let log = EventLog::default();
        let seq = sequencer(EchoTts::new(log.clone()), RecordingOutput::new(log.clone()));
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![]));
        let mut cap = capture(&mic);
        let mut state = ConversationState::default();
        assert!(state.set_recording(true));

        let err = seq
            .play(&mut state, &mut cap, "en-IN", "Hello.")
            .await
            .unwrap_err();

        assert_eq!(err, SpeechError::CaptureActive);
        assert!(log.events().is_empty());
        assert!(!state.is_playing_speech());
    }

    #[tokio::test]
    async fn synthesis_failure_stops_remaining_chunks() {
        let log = EventLog::default();
        let seq = sequencer(
            EchoTts::new(log.clone()).failing_at(1),
            RecordingOutput::new(log.clone()),
        );
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![]));
        let mut cap = capture(&mic);
        let mut state = ConversationState::default();

        let err = seq
            .play(&mut state, &mut cap, "ta-IN", "One. Two. Three.")
            .await
            .unwrap_err();

        assert!(matches!(err, SpeechError::Synthesis { index: 1, .. }));
        assert_eq!(
            log.events(),
            vec!["synth:One. Two.", "play:One. Two.", "done:One. Two.", "synth:Three."]
        );
        assert!(!state.is_playing_speech());
    }

    #[tokio::test]
    async fn playback_failure_clears_flag() {
        let log = EventLog::default();
        let seq = sequencer(
            EchoTts::new(log.clone()),
            RecordingOutput::new(log.clone()).failing_at(0),
        );
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![]));
        let mut cap = capture(&mic);
        let mut state = ConversationState::default();

        let err = seq
            .play(&mut state, &mut cap, "en-IN", "Hello. World.")
            .await
            .unwrap_err();

        assert!(matches!(err, SpeechError::Playback { index: 0, .. }));
        assert_eq!(log.events(), vec!["synth:Hello.", "play:Hello."]);
        assert!(!state.is_playing_speech());
    }

    #[tokio::test]
    async fn blank_text_plays_nothing() {
        let log = EventLog::default();
        let seq = sequencer(EchoTts::new(log.clone()), RecordingOutput::new(log.clone()));
        let mic = Arc::new(ScriptedMicrophone::with_frames(vec![]));
        let mut cap = capture(&mic);
        let mut state = ConversationState::default();
        let mut rx = state.subscribe();

        let played = seq.play(&mut state, &mut cap, "en-IN", "   ").await.unwrap();

        assert_eq!(played, 0);
        assert!(log.events().is_empty());
        assert!(rx.try_recv().is_err());
    }
}
