#![allow(dead_code)]

use engine::core::config::{SessionConfig, Settings};
use engine::core::error::StorageError;
use engine::core::storage::{HistoryStore, SessionRecord};
use engine::tasks::nback::{
    Modality, ModalitySet, NBackSession, Presenter, SessionStatus, Stimulus, Symbol,
};

pub const TRIAL_MS: u64 = 2500;

pub fn settings(n_level: u8, modalities: ModalitySet, total_trials: usize) -> Settings {
    Settings {
        session: SessionConfig::new(n_level, modalities, total_trials),
        ..Settings::default()
    }
}

/// A stream of `total` symbols that repeats `n` back exactly at `matches`.
pub fn stream_with_matches(n: usize, total: usize, matches: &[usize]) -> Vec<Symbol> {
    let mut stream: Vec<u8> = Vec::with_capacity(total);
    for index in 0..total {
        let value = if index >= n && matches.contains(&index) {
            stream[index - n]
        } else {
            let avoid = index.checked_sub(n).map(|back| stream[back]);
            let previous = stream.last().copied();
            (0u8..8)
                .find(|candidate| Some(*candidate) != avoid && Some(*candidate) != previous)
                .unwrap_or(0)
        };
        stream.push(value);
    }
    stream.into_iter().map(Symbol::new).collect()
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub shown: Vec<Stimulus>,
    pub hidden: usize,
    pub spoken: Vec<String>,
    pub trials_started: Vec<usize>,
    pub feedback: Vec<(Modality, bool)>,
}

impl Recorder {
    pub fn calls(&self) -> usize {
        self.shown.len()
            + self.hidden
            + self.spoken.len()
            + self.trials_started.len()
            + self.feedback.len()
    }
}

impl Presenter for Recorder {
    fn show_stimulus(&mut self, stimulus: Stimulus) {
        self.shown.push(stimulus);
    }

    fn hide_stimulus(&mut self) {
        self.hidden += 1;
    }

    fn speak(&mut self, text: &str) {
        self.spoken.push(text.to_string());
    }

    fn trial_started(&mut self, trial_index: usize, _total_trials: usize) {
        self.trials_started.push(trial_index);
    }

    fn show_feedback(&mut self, modality: Modality, is_match: bool) {
        self.feedback.push((modality, is_match));
    }
}

/// Rejects every write.
#[derive(Debug, Default)]
pub struct FailingStore;

impl HistoryStore for FailingStore {
    fn append(&mut self, _record: &SessionRecord) -> Result<(), StorageError> {
        Err(StorageError::NoDataDir)
    }

    fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        Ok(Vec::new())
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Steps virtual time callback by callback, raising `flags(trial)` once at
/// each trial onset.
pub fn drive<P, H, F>(session: &mut NBackSession<P, H>, mut flags: F)
where
    P: Presenter,
    H: HistoryStore,
    F: FnMut(usize) -> ModalitySet,
{
    let mut flagged = None;
    while session.status() == SessionStatus::Running {
        if let Some(trial) = session.current_trial() {
            if flagged != Some(trial) {
                for modality in flags(trial).iter() {
                    session.flag(modality);
                }
                flagged = Some(trial);
            }
        }
        let Some(due) = session.next_deadline() else {
            break;
        };
        session.advance_to(due);
    }
}
