//! Keyword-driven loan conversation stage tracking.
//!
//! [`StageTracker`] lower-cases each new piece of conversation text and scans
//! it against two fixed keyword sets.  Every matching set proposes a floor
//! for the stage; the highest floor wins and the stage never moves backwards.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Phase of the loan conversation.
///
/// ```text
/// InformationCollection ──▶ Assessment ──▶ Approval (terminal)
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Stage {
    #[default]
    InformationCollection,
    Assessment,
    Approval,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::InformationCollection, Stage::Assessment, Stage::Approval];

    /// Position in the progression, `0..=2`.
    pub fn index(self) -> u8 {
        match self {
            Stage::InformationCollection => 0,
            Stage::Assessment => 1,
            Stage::Approval => 2,
        }
    }

    /// Inverse of [`index`](Self::index); values above 2 saturate at
    /// `Approval`.
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => Stage::InformationCollection,
            1 => Stage::Assessment,
            _ => Stage::Approval,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::InformationCollection => "Information Collection",
            Stage::Assessment => "Loan Assessment",
            Stage::Approval => "Final Approval",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::InformationCollection => "Basic details and requirements",
            Stage::Assessment => "Evaluating loan options",
            Stage::Approval => "Loan offer and completion",
        }
    }

    /// Fraction of the progress bar filled at this stage, `0.0..=1.0`.
    pub fn progress(self) -> f32 {
        self.index() as f32 / (Self::ALL.len() - 1) as f32
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Approval
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

// ---------------------------------------------------------------------------
// Keyword sets
// ---------------------------------------------------------------------------

struct StageKeywords {
    floor: Stage,
    keywords: &'static [&'static str],
}

static STAGE_KEYWORDS: &[StageKeywords] = &[
    StageKeywords {
        floor: Stage::Assessment,
        keywords: &[
            "evaluate",
            "income",
            "salary",
            "credit",
            "bank",
            "statement",
            "document",
            "verify",
        ],
    },
    StageKeywords {
        floor: Stage::Approval,
        keywords: &[
            "approve",
            "offer",
            "sanction",
            "grant",
            "confirm",
            "congratulation",
            "success",
        ],
    },
];

// ---------------------------------------------------------------------------
// StageTracker
// ---------------------------------------------------------------------------

/// Monotonic stage tracker.
///
/// # Example
/// ```rust
/// use loan_voice::conversation::{Stage, StageTracker};
///
/// let mut tracker = StageTracker::new();
/// assert_eq!(tracker.update("My salary is 40,000 a month"), Stage::Assessment);
/// assert_eq!(tracker.update("hello again"), Stage::Assessment);
/// assert_eq!(tracker.update("Congratulations, approved!"), Stage::Approval);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StageTracker {
    stage: Stage,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Stage {
        self.stage
    }

    /// The stage `text` would move the tracker to, without committing it.
    pub fn peek(&self, text: &str) -> Stage {
        let lower = text.to_lowercase();
        STAGE_KEYWORDS
            .iter()
            .filter(|set| set.keywords.iter().any(|kw| lower.contains(kw)))
            .map(|set| set.floor)
            .fold(self.stage, Stage::max)
    }

    /// Fold `text` into the tracker and return the (possibly advanced) stage.
    pub fn update(&mut self, text: &str) -> Stage {
        let next = self.peek(text);
        if next != self.stage {
            log::info!("stage: {} -> {}", self.stage, next);
            self.stage = next;
        }
        self.stage
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
