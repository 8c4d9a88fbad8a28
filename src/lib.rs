//! Voice conversation core for a multilingual loan assistant.
//!
//! A [`ConversationOrchestrator`](conversation::ConversationOrchestrator)
//! runs one turn at a time: capture an utterance, transcribe it, ask the chat
//! backend for a reply and speak that reply chunk by chunk.  Capture and
//! playback never overlap.

pub mod audio;
pub mod config;
pub mod conversation;
pub mod services;
pub mod speech;

#[cfg(test)]
mod testing;
