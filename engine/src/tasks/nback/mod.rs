//! Multi-modal n-back task: sequence generation, trial clock, scoring and the session driver.

pub mod engine;
pub mod metrics;
pub mod modality;
pub mod response;
pub mod runner;
pub mod scoring;
pub mod sequence;
pub mod session;

pub use engine::{ClockState, NBackTrial, TrialClock};
pub use metrics::{next_level, AccuracyTier, LevelChange, NBackMetrics};
pub use modality::{Modality, ModalitySet, Stimulus, Symbol};
pub use runner::{run_session, session_channel, SessionEnd, SessionHandle};
pub use scoring::{ScoreTally, TrialOutcome};
pub use sequence::Sequences;
pub use session::{
    FlagResult, NBackSession, Presenter, SessionStatus, SessionSummary,
    SilentPresenter,
};
