//! Error types shared across the engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::tasks::nback::Modality;

/// Rejected session or settings input. Raised before any trial runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one modality must be enabled")]
    NoModalities,

    #[error("n-back level {level} is outside 1..={max}")]
    LevelOutOfRange { level: u8, max: u8 },

    #[error("maximum level {0} is outside 1..=8")]
    MaxLevelOutOfRange(u8),

    #[error("a session needs at least one trial")]
    NoTrials,

    #[error("match probability {0} is outside 0..=1")]
    InvalidProbability(f64),

    #[error("level-down threshold {down} is above level-up threshold {up}")]
    InvalidThresholds { up: f64, down: f64 },

    #[error("stimulus duration {stimulus_ms} ms exceeds trial duration {trial_ms} ms")]
    InvalidTiming { stimulus_ms: u64, trial_ms: u64 },

    #[error("spoken digit delay {number_delay_ms} ms is not before trial close at {trial_ms} ms")]
    NumberDelayTooLong { number_delay_ms: u64, trial_ms: u64 },

    #[error("unknown modality `{0}`")]
    UnknownModality(String),

    #[error("{modality} stream has {actual} values, expected {expected}")]
    SequenceMismatch {
        modality: Modality,
        expected: usize,
        actual: usize,
    },

    #[error("failed to read settings from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// History store failures. Never fatal to a running session.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("history store I/O failed at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("no data directory available on this platform")]
    NoDataDir,
}
