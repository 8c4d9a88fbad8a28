//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each service
//! binding and the capture pipeline, `AppPaths` for the platform config
//! directory, and TOML persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AudioConfig, ChatConfig, ConversationConfig, SttConfig, TtsConfig, API_KEY_ENV,
};
