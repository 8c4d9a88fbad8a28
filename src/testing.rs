//! Scripted doubles for the hardware and service seams, shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::audio::{
    AudioOutput, AudioSegment, CaptureError, MicStream, Microphone, PlaybackError,
};
use crate::services::{
    ChatRequest, ChatService, ServiceError, SpeechToText, SynthesizedAudio, TextToSpeech,
};

pub const SAMPLE_RATE: u32 = 16_000;

pub fn loud(n: usize) -> Vec<f32> {
    vec![0.5; n]
}

pub fn quiet(n: usize) -> Vec<f32> {
    vec![0.0; n]
}

/// Ordered record of calls across several doubles.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// ScriptedMicrophone
// ---------------------------------------------------------------------------

struct OpenGuard {
    live: Arc<AtomicUsize>,
    _tx: Option<mpsc::UnboundedSender<Vec<f32>>>,
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Each `open` delivers the next queued script of frames.  Once the queue is
/// empty further opens yield a silent stream that stays open.
pub struct ScriptedMicrophone {
    scripts: Mutex<VecDeque<Vec<Vec<f32>>>>,
    failure: Option<CaptureError>,
    close_after_script: bool,
    live: Arc<AtomicUsize>,
    opens: AtomicUsize,
}

impl ScriptedMicrophone {
    pub fn with_frames(frames: Vec<Vec<f32>>) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::from([frames])),
            failure: None,
            close_after_script: false,
            live: Arc::new(AtomicUsize::new(0)),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: CaptureError) -> Self {
        let mut mic = Self::with_frames(Vec::new());
        mic.failure = Some(error);
        mic
    }

    /// Queue another script for the following `open`.
    pub fn then(self, frames: Vec<Vec<f32>>) -> Self {
        self.scripts.lock().unwrap().push_back(frames);
        self
    }

    /// End the frame stream once the script has been delivered.
    pub fn closing_after_script(mut self) -> Self {
        self.close_after_script = true;
        self
    }

    /// `true` when no stream handed out by this microphone is still open.
    pub fn released(&self) -> bool {
        self.live.load(Ordering::SeqCst) == 0
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Microphone for ScriptedMicrophone {
    async fn open(&self) -> Result<MicStream, CaptureError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.opens.fetch_add(1, Ordering::SeqCst);

        let frames = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        let (tx, rx) = mpsc::unbounded_channel();
        for frame in frames {
            tx.send(frame).unwrap();
        }

        self.live.fetch_add(1, Ordering::SeqCst);
        let guard = OpenGuard {
            live: Arc::clone(&self.live),
            _tx: if self.close_after_script { None } else { Some(tx) },
        };
        Ok(MicStream::new(rx, SAMPLE_RATE, Box::new(guard)))
    }
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// Chat double answering from a queue; an empty queue answers "Okay.".
#[derive(Default)]
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Result<String, ServiceError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    pub fn replying(replies: Vec<Result<String, ServiceError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatService for ScriptedChat {
    async fn reply(&self, request: &ChatRequest) -> Result<String, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Okay.".to_string()))
    }
}

/// Transcription double answering from a queue; an empty queue hears nothing.
#[derive(Default)]
pub struct ScriptedStt {
    transcripts: Mutex<VecDeque<Result<Option<String>, ServiceError>>>,
    segment_lengths: Mutex<Vec<usize>>,
}

impl ScriptedStt {
    pub fn hearing(transcripts: Vec<Result<Option<String>, ServiceError>>) -> Self {
        Self {
            transcripts: Mutex::new(transcripts.into()),
            segment_lengths: Mutex::new(Vec::new()),
        }
    }

    pub fn segment_lengths(&self) -> Vec<usize> {
        self.segment_lengths.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn transcribe(
        &self,
        audio: &AudioSegment,
        _language_code: &str,
    ) -> Result<Option<String>, ServiceError> {
        self.segment_lengths.lock().unwrap().push(audio.len());
        self.transcripts.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}

/// Synthesis double that returns the chunk text as the clip bytes.
pub struct EchoTts {
    log: EventLog,
    fail_at: Option<usize>,
    calls: AtomicUsize,
}

impl EchoTts {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            fail_at: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail the `index`-th call (0-based).
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }
}

#[async_trait]
impl TextToSpeech for EchoTts {
    async fn synthesize(
        &self,
        text: &str,
        _language_code: &str,
    ) -> Result<SynthesizedAudio, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("synth:{text}"));
        if self.fail_at == Some(call) {
            return Err(ServiceError::Status {
                status: 500,
                body: "synthesis down".into(),
            });
        }
        Ok(SynthesizedAudio {
            bytes: text.as_bytes().to_vec(),
        })
    }
}

/// Output double that logs each clip and yields to the runtime while
/// "playing".
pub struct RecordingOutput {
    log: EventLog,
    fail_at: Option<usize>,
    calls: AtomicUsize,
}

impl RecordingOutput {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            fail_at: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }
}

#[async_trait]
impl AudioOutput for RecordingOutput {
    async fn play(&self, clip: &[u8]) -> Result<(), PlaybackError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let text = String::from_utf8_lossy(clip).to_string();
        self.log.push(format!("play:{text}"));
        if self.fail_at == Some(call) {
            return Err(PlaybackError::Device("speaker unplugged".into()));
        }
        tokio::task::yield_now().await;
        self.log.push(format!("done:{text}"));
        Ok(())
    }
}
