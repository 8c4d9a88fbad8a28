//! The conversation core: state, stage tracking, listening-window sizing
//! and the turn state machine.

pub mod duration;
pub mod error;
pub mod language;
pub mod orchestrator;
pub mod stage;
pub mod state;

pub use duration::RecordingDurationEstimator;
pub use error::{TurnError, TurnOutcome};
pub use language::Language;
pub use orchestrator::{Collaborators, ConversationOrchestrator};
pub use stage::{Stage, StageTracker};
pub use state::{ConversationState, Message, Sender, StatusSnapshot, TurnPhase};
