//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to the service
//! bindings at startup.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Environment variable consulted when a service section leaves `api_key`
/// empty.
pub const API_KEY_ENV: &str = "LOAN_VOICE_API_KEY";

fn resolve_api_key(configured: &Option<String>) -> Option<String> {
    match configured.as_deref() {
        Some(key) if !key.is_empty() => Some(key.to_string()),
        _ => std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()),
    }
}

// ---------------------------------------------------------------------------
// ChatConfig
// ---------------------------------------------------------------------------

/// Settings for the chat-reply service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Full URL of the chat endpoint.
    pub url: String,
    /// Sent as `api-subscription-key` when non-empty.
    pub api_key: Option<String>,
    /// Maximum seconds to wait for a reply before the request times out.
    pub timeout_secs: u64,
}

impl ChatConfig {
    /// Configured key, falling back to [`API_KEY_ENV`].
    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(&self.api_key)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/api/chat".into(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the remote speech-to-text service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    pub url: String,
    pub api_key: Option<String>,
    /// Model identifier sent with every transcription request.
    pub model: String,
    pub timeout_secs: u64,
}

impl SttConfig {
    /// Configured key, falling back to [`API_KEY_ENV`].
    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(&self.api_key)
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            url: "https://api.sarvam.ai/speech-to-text".into(),
            api_key: None,
            model: "saarika:v2".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for the remote text-to-speech service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub url: String,
    pub api_key: Option<String>,
    /// Voice name requested from the service.
    pub speaker: String,
    /// Speaking rate multiplier (1.0 = normal).
    pub pace: f32,
    /// Loudness multiplier (1.0 = normal).
    pub loudness: f32,
    pub timeout_secs: u64,
}

impl TtsConfig {
    /// Configured key, falling back to [`API_KEY_ENV`].
    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(&self.api_key)
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            url: "https://api.sarvam.ai/text-to-speech".into(),
            api_key: None,
            speaker: "meera".into(),
            pace: 1.0,
            loudness: 1.0,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for microphone capture and voice-activity detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Mean absolute amplitude above which the input counts as speech.
    pub vad_threshold: f32,
    /// Number of mono samples analysed per VAD decision.
    pub analysis_window: usize,
    /// Input device name. `None` means the system default.
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            vad_threshold: 0.02,
            analysis_window: 4096,
            device: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ConversationConfig
// ---------------------------------------------------------------------------

/// Per-conversation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Locale used when the front end does not ask the user to pick one.
    pub language: String,
    /// Chat session identifier. Generated at startup when `None`.
    pub session_id: Option<String>,
    /// Listening window used before the first bot reply has been measured.
    pub initial_recording_ms: u64,
}

impl ConversationConfig {
    /// Configured session id, or a fresh one derived from the wall clock.
    pub fn session_id(&self) -> String {
        match self.session_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let millis = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or_default();
                format!("session-{millis}")
            }
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            language: "en-IN".into(),
            session_id: None,
            initial_recording_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use loan_voice::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// println!("chat endpoint: {}", config.chat.url);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chat: ChatConfig,
    pub stt: SttConfig,
    pub tts: TtsConfig,
    pub audio: AudioConfig,
    pub conversation: ConversationConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario).
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the capture pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.audio.analysis_window > 0,
            "audio.analysis_window must be greater than 0"
        );
        anyhow::ensure!(
            self.audio.vad_threshold.is_finite() && self.audio.vad_threshold >= 0.0,
            "audio.vad_threshold must be a non-negative number, got {}",
            self.audio.vad_threshold
        );
        Ok(())
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
