//! Per-trial response flags.

use super::modality::{Modality, ModalitySet};

/// Flags raised during the open window of the current trial only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseWindow {
    trial: Option<usize>,
    pressed: ModalitySet,
}

impl ResponseWindow {
    /// Opens a fresh, all-false window for `trial`.
    pub fn open(&mut self, trial: usize) {
        self.trial = Some(trial);
        self.pressed = ModalitySet::empty();
    }

    /// Freezes the window and returns what was pressed.
    pub fn close(&mut self) -> ModalitySet {
        self.trial = None;
        self.pressed
    }

    pub fn trial(&self) -> Option<usize> {
        self.trial
    }

    pub fn is_open(&self) -> bool {
        self.trial.is_some()
    }

    /// Records a flag; repeats are no-ops. Returns false when no window is open.
    pub fn flag(&mut self, modality: Modality) -> bool {
        if self.trial.is_none() {
            return false;
        }
        self.pressed.insert(modality);
        true
    }

    pub fn is_flagged(&self, modality: Modality) -> bool {
        self.trial.is_some() && self.pressed.contains(modality)
    }

    pub fn pressed(&self) -> ModalitySet {
        self.pressed
    }
}
