//! Listening-window estimation from the length of the last bot reply.
//!
//! Longer replies tend to ask for longer answers, so the next capture window
//! grows with the reply's word count:
//!
//! ```text
//! clamp(5000 + words * 200, 5000, 30000)   milliseconds
//! ```
//!
//! The estimate replaces the previous window outright; nothing is averaged
//! across turns.

use std::time::Duration;

/// Computes the next listening window from a bot reply.
///
/// ```rust
/// use loan_voice::conversation::RecordingDurationEstimator;
///
/// let estimator = RecordingDurationEstimator::default();
/// assert_eq!(estimator.estimate_ms("one two three four five six seven eight nine"), 6_800);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingDurationEstimator {
    base_ms: u64,
    per_word_ms: u64,
    max_ms: u64,
}

impl RecordingDurationEstimator {
    pub const BASE_MS: u64 = 5_000;
    pub const PER_WORD_MS: u64 = 200;
    pub const MAX_MS: u64 = 30_000;

    /// Number of whitespace-delimited tokens.
    pub fn word_count(text: &str) -> usize {
        text.split_whitespace().count()
    }

    /// Listening window in milliseconds for the turn after `reply`.
    pub fn estimate_ms(&self, reply: &str) -> u64 {
        let words = Self::word_count(reply) as u64;
        self.base_ms
            .saturating_add(words.saturating_mul(self.per_word_ms))
            .clamp(self.base_ms, self.max_ms)
    }

    pub fn estimate(&self, reply: &str) -> Duration {
        Duration::from_millis(self.estimate_ms(reply))
    }
}

impl Default for RecordingDurationEstimator {
    fn default() -> Self {
        Self {
            base_ms: Self::BASE_MS,
            per_word_ms: Self::PER_WORD_MS,
            max_ms: Self::MAX_MS,
        }
    }
}
