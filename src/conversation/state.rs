//! Conversation state, turn phases and the message history types.
//!
//! [`ConversationState`] is the single owned value holding the language,
//! stage, activity flags and current listening window.  The orchestrator
//! passes it by `&mut` into each component call; nothing else holds it.
//!
//! Every change is published as a [`StatusSnapshot`] to subscribers so a
//! presentation layer can enable/disable its microphone and send controls.
//!
//! Capture and playback are mutually exclusive: [`set_recording`] refuses to
//! raise `is_recording` while speech is playing, and [`set_playing_speech`]
//! refuses the reverse.
//!
//! [`set_recording`]: ConversationState::set_recording
//! [`set_playing_speech`]: ConversationState::set_playing_speech

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::stage::Stage;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Who produced a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry in the conversation history.  Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
        }
    }
}

// ---------------------------------------------------------------------------
// TurnPhase
// ---------------------------------------------------------------------------

/// Where the orchestrator is in the turn cycle.
///
/// ```text
/// Idle ──start(language)──▶ Speaking(greeting) ──▶ Ready
/// Ready ──listen──▶ Listening ──segment──▶ Transcribing ──▶ Replying ──▶ Speaking ──▶ Ready
/// Ready ──send_text────────────────────────────────────────▶ Replying ──▶ Speaking ──▶ Ready
/// any failure ──▶ Ready
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TurnPhase {
    /// No language selected yet.
    #[default]
    Idle,
    /// Waiting for the user to press the microphone or type a message.
    Ready,
    Listening,
    Transcribing,
    Replying,
    Speaking,
}

impl TurnPhase {
    /// Returns `true` while a turn is in flight and new triggers must be
    /// rejected.
    ///
    /// ```
    /// use loan_voice::conversation::TurnPhase;
    ///
    /// assert!(!TurnPhase::Ready.is_busy());
    /// assert!(TurnPhase::Listening.is_busy());
    /// assert!(TurnPhase::Speaking.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            TurnPhase::Listening
                | TurnPhase::Transcribing
                | TurnPhase::Replying
                | TurnPhase::Speaking
        )
    }

    /// A short human-readable label for status bars.
    pub fn label(&self) -> &'static str {
        match self {
            TurnPhase::Idle => "Choose a language",
            TurnPhase::Ready => "Ready",
            TurnPhase::Listening => "Listening",
            TurnPhase::Transcribing => "Transcribing",
            TurnPhase::Replying => "Thinking",
            TurnPhase::Speaking => "Speaking",
        }
    }
}

// ---------------------------------------------------------------------------
// StatusSnapshot
// ---------------------------------------------------------------------------

/// Copy of the observable state, published on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub language: Option<String>,
    pub stage: Stage,
    pub phase: TurnPhase,
    pub is_recording: bool,
    pub is_processing: bool,
    pub is_playing_speech: bool,
    pub recording_duration_ms: u64,
}

// ---------------------------------------------------------------------------
// ConversationState
// ---------------------------------------------------------------------------

/// The one live state value of a conversation.
#[derive(Debug)]
pub struct ConversationState {
    language: Option<String>,
    stage: Stage,
    phase: TurnPhase,
    is_recording: bool,
    is_processing: bool,
    is_playing_speech: bool,
    recording_duration_ms: u64,
    subscribers: Vec<mpsc::UnboundedSender<StatusSnapshot>>,
}

impl ConversationState {
    pub fn new(initial_recording_ms: u64) -> Self {
        Self {
            language: None,
            stage: Stage::default(),
            phase: TurnPhase::Idle,
            is_recording: false,
            is_processing: false,
            is_playing_speech: false,
            recording_duration_ms: initial_recording_ms,
            subscribers: Vec::new(),
        }
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn is_playing_speech(&self) -> bool {
        self.is_playing_speech
    }

    pub fn recording_duration_ms(&self) -> u64 {
        self.recording_duration_ms
    }

    /// `true` when a new capture or typed message may start.
    pub fn is_ready(&self) -> bool {
        self.phase == TurnPhase::Ready
            && !self.is_recording
            && !self.is_processing
            && !self.is_playing_speech
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            language: self.language.clone(),
            stage: self.stage,
            phase: self.phase,
            is_recording: self.is_recording,
            is_processing: self.is_processing,
            is_playing_speech: self.is_playing_speech,
            recording_duration_ms: self.recording_duration_ms,
        }
    }

    /// Receive a snapshot after every subsequent change.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StatusSnapshot> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    // -----------------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------------

    pub(crate) fn set_language(&mut self, language: &str) {
        self.language = Some(language.to_string());
        self.publish();
    }

    pub(crate) fn set_phase(&mut self, phase: TurnPhase) {
        if self.phase != phase {
            log::debug!("phase: {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
            self.publish();
        }
    }

    /// Stages only move forward; a lower value is ignored.
    pub(crate) fn set_stage(&mut self, stage: Stage) {
        if stage > self.stage {
            self.stage = stage;
            self.publish();
        }
    }

    pub(crate) fn set_processing(&mut self, processing: bool) {
        if self.is_processing != processing {
            self.is_processing = processing;
            self.publish();
        }
    }

    pub(crate) fn set_recording_duration_ms(&mut self, ms: u64) {
        if self.recording_duration_ms != ms {
            self.recording_duration_ms = ms;
            self.publish();
        }
    }

    /// Returns whether the flag now holds `recording`.  Raising it is
    /// refused while speech is playing.
    pub(crate) fn set_recording(&mut self, recording: bool) -> bool {
        if recording && self.is_playing_speech {
            log::warn!("state: refusing to record while speech is playing");
            return false;
        }
        if self.is_recording != recording {
            self.is_recording = recording;
            self.publish();
        }
        true
    }

    /// Returns whether the flag now holds `playing`.  Raising it is refused
    /// while recording; abort the capture first.
    pub(crate) fn set_playing_speech(&mut self, playing: bool) -> bool {
        if playing && self.is_recording {
            log::warn!("state: refusing to play speech while recording");
            return false;
        }
        if self.is_playing_speech != playing {
            self.is_playing_speech = playing;
            self.publish();
        }
        true
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(10_000)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
