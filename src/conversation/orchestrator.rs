//! Turn state machine tying capture, transcription, chat and speech together.
//!
//! Exactly one turn runs at a time.  Every public operation takes `&mut self`
//! and first checks that the conversation is in the ready state, so a second
//! trigger while a turn is in flight is rejected with [`TurnError::Busy`].
//! Every failure path returns the state to ready before the error is
//! reported, and the message history only ever receives complete messages.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::audio::{
    AudioCaptureSession, AudioOutput, CpalMicrophone, Microphone, RodioOutput, VadDetector,
};
use crate::config::AppConfig;
use crate::services::{
    ChatRequest, ChatService, HttpChatService, HttpSpeechToText, HttpTextToSpeech, SpeechToText,
    TextToSpeech,
};
use crate::speech::SpeechPlaybackSequencer;

use super::duration::RecordingDurationEstimator;
use super::error::{TurnError, TurnOutcome};
use super::language::Language;
use super::stage::StageTracker;
use super::state::{ConversationState, Message, StatusSnapshot, TurnPhase};

/// The hardware and remote services a conversation talks to.
pub struct Collaborators {
    pub microphone: Arc<dyn Microphone>,
    pub output: Arc<dyn AudioOutput>,
    pub chat: Arc<dyn ChatService>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
}

impl Collaborators {
    /// Default device, HTTP services from `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            microphone: Arc::new(CpalMicrophone::new(config.audio.device.clone())),
            output: Arc::new(RodioOutput::new()),
            chat: Arc::new(HttpChatService::from_config(&config.chat)),
            stt: Arc::new(HttpSpeechToText::from_config(&config.stt)),
            tts: Arc::new(HttpTextToSpeech::from_config(&config.tts)),
        }
    }
}

pub struct ConversationOrchestrator {
    state: ConversationState,
    messages: Vec<Message>,
    capture: AudioCaptureSession,
    speech: SpeechPlaybackSequencer,
    chat: Arc<dyn ChatService>,
    stt: Arc<dyn SpeechToText>,
    stages: StageTracker,
    durations: RecordingDurationEstimator,
    session_id: String,
}

impl ConversationOrchestrator {
    pub fn new(
        collaborators: Collaborators,
        vad: VadDetector,
        session_id: impl Into<String>,
        initial_recording_ms: u64,
    ) -> Self {
        let Collaborators {
            microphone,
            output,
            chat,
            stt,
            tts,
        } = collaborators;
        Self {
            state: ConversationState::new(initial_recording_ms),
            messages: Vec::new(),
            capture: AudioCaptureSession::new(microphone, vad),
            speech: SpeechPlaybackSequencer::new(tts, output),
            chat,
            stt,
            stages: StageTracker::new(),
            durations: RecordingDurationEstimator::default(),
            session_id: session_id.into(),
        }
    }

    /// Build against the real devices and HTTP services.  Fails when
    /// `config` does not pass [`AppConfig::validate`].
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self::new(
            Collaborators::from_config(config),
            VadDetector::new(config.audio.vad_threshold, config.audio.analysis_window),
            config.conversation.session_id(),
            config.conversation.initial_recording_ms,
        ))
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// History in chronological order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Receive a [`StatusSnapshot`] after every state change.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StatusSnapshot> {
        self.state.subscribe()
    }

    // -----------------------------------------------------------------------
    // Turns
    // -----------------------------------------------------------------------

    /// Fix the conversation language and speak its greeting.
    ///
    /// The greeting is appended to the history before it is spoken, so it
    /// stays there even if synthesis fails.
    pub async fn start(&mut self, language_code: &str) -> Result<(), TurnError> {
        if let Some(current) = self.state.language() {
            return Err(TurnError::AlreadyStarted(current.to_string()));
        }
        let language = Language::find(language_code)
            .ok_or_else(|| TurnError::UnsupportedLanguage(language_code.to_string()))?;

        log::info!("conversation {}: starting in {language}", self.session_id);
        self.state.set_language(language.code);
        self.messages.push(Message::bot(language.greeting));

        self.state.set_processing(true);
        let spoken = self.speak(language.greeting).await;
        self.finish_turn();
        spoken
    }

    /// Listen for one utterance and run the full turn on it.
    pub async fn listen(&mut self) -> Result<TurnOutcome, TurnError> {
        self.ensure_ready()?;

        let window = Duration::from_millis(self.state.recording_duration_ms());
        self.state.set_phase(TurnPhase::Listening);
        if let Err(e) = self.capture.begin(&mut self.state, window).await {
            log::warn!("conversation {}: microphone unavailable: {e}", self.session_id);
            self.finish_turn();
            return Err(e.into());
        }

        let Some(segment) = self.capture.next_segment(&mut self.state).await else {
            log::info!(
                "conversation {}: no speech within {} ms",
                self.session_id,
                window.as_millis()
            );
            self.finish_turn();
            return Ok(TurnOutcome::NoSpeech);
        };

        self.state.set_processing(true);
        self.state.set_phase(TurnPhase::Transcribing);
        let language = self.language_code();
        let transcript = match self.stt.transcribe(&segment, &language).await {
            Ok(Some(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                log::info!("conversation {}: empty transcript", self.session_id);
                self.finish_turn();
                return Ok(TurnOutcome::EmptyTranscript);
            }
            Err(e) => {
                log::warn!("conversation {}: transcription failed: {e}", self.session_id);
                self.finish_turn();
                return Err(TurnError::TranscriptionFailed(e));
            }
        };
        drop(segment);

        self.respond(transcript).await
    }

    /// Run a turn on typed text, skipping capture and transcription.
    pub async fn send_text(&mut self, text: &str) -> Result<TurnOutcome, TurnError> {
        self.ensure_ready()?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(TurnOutcome::EmptyTranscript);
        }
        self.state.set_processing(true);
        self.respond(text.to_string()).await
    }

    /// Drop whatever the current turn holds and return to ready.  History
    /// and stage are kept.
    pub fn cancel(&mut self) {
        self.capture.abort(&mut self.state);
        self.state.set_playing_speech(false);
        self.finish_turn();
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_ready(&self) -> Result<(), TurnError> {
        match self.state.phase() {
            TurnPhase::Idle => Err(TurnError::NoLanguage),
            phase if !self.state.is_ready() => Err(TurnError::Busy(phase)),
            _ => Ok(()),
        }
    }

    fn language_code(&self) -> String {
        self.state.language().unwrap_or_default().to_string()
    }

    async fn respond(&mut self, user_text: String) -> Result<TurnOutcome, TurnError> {
        self.messages.push(Message::user(user_text.as_str()));
        self.state.set_phase(TurnPhase::Replying);

        let request = ChatRequest {
            session_id: self.session_id.clone(),
            message: user_text,
            language_code: self.language_code(),
        };
        let reply = match self.chat.reply(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("conversation {}: reply failed: {e}", self.session_id);
                self.finish_turn();
                return Err(TurnError::ReplyGenerationFailed(e));
            }
        };

        let stage = self.stages.update(&request.message);
        self.state.set_stage(stage);
        self.messages.push(Message::bot(reply.as_str()));
        self.state
            .set_recording_duration_ms(self.durations.estimate_ms(&reply));

        let spoken = self.speak(&reply).await;
        self.finish_turn();
        spoken.map(|()| TurnOutcome::Completed { reply })
    }

    async fn speak(&mut self, text: &str) -> Result<(), TurnError> {
        self.state.set_phase(TurnPhase::Speaking);
        let language = self.language_code();
        self.speech
            .play(&mut self.state, &mut self.capture, &language, text)
            .await
            .map(|_| ())
            .map_err(TurnError::SynthesisFailed)
    }

    fn finish_turn(&mut self) {
        self.state.set_processing(false);
        let phase = if self.state.language().is_some() {
            TurnPhase::Ready
        } else {
            TurnPhase::Idle
        };
        self.state.set_phase(phase);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
