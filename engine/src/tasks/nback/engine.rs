//! Trial lifecycle state machine for n-back sessions.
//!
//! The clock never sleeps. `begin_trial` hands back the callbacks the
//! caller must schedule (offsets from stimulus onset) and `accept` applies
//! one fired callback. Callbacks carry the run id and trial index so a
//! late delivery from an earlier trial or session is recognised and dropped.

use tracing::debug;

use super::modality::{ModalitySet, Stimulus};
use super::scoring::TrialEvaluation;
use crate::core::config::TrialTiming;
use crate::core::timing::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    StimulusOn { trial: usize },
    /// Stimulus hidden, responses still accepted.
    ResponseOpen { trial: usize },
    TrialClosed { trial: usize },
    SessionDone,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialEvent {
    StimulusOff,
    SpeakNumber,
    TrialClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    pub run_id: u64,
    pub trial_index: usize,
    pub event: TrialEvent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialPlan {
    pub trial_index: usize,
    /// `(offset from onset, callback)` in scheduling order.
    pub ticks: Vec<(Millis, ClockTick)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Callback from another trial/run, or one that no longer applies.
    Stale,
    StimulusHidden { trial: usize },
    SpeakNumber { trial: usize },
    Closed { trial: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    NextTrial(usize),
    SessionDone,
    /// `advance` called while no trial was closed.
    NotClosed,
}

#[derive(Debug, Clone)]
pub struct TrialClock {
    run_id: u64,
    total_trials: usize,
    timing: TrialTiming,
    speak_number: bool,
    state: ClockState,
}

impl TrialClock {
    pub fn new(run_id: u64, total_trials: usize, timing: TrialTiming, speak_number: bool) -> Self {
        Self {
            run_id,
            total_trials,
            timing,
            speak_number,
            state: ClockState::Idle,
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn total_trials(&self) -> usize {
        self.total_trials
    }

    pub fn current_trial(&self) -> Option<usize> {
        match self.state {
            ClockState::StimulusOn { trial }
            | ClockState::ResponseOpen { trial }
            | ClockState::TrialClosed { trial } => Some(trial),
            _ => None,
        }
    }

    /// Responses are accepted from onset until close, stimulus visible or not.
    pub fn is_window_open(&self) -> bool {
        matches!(
            self.state,
            ClockState::StimulusOn { .. } | ClockState::ResponseOpen { .. }
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, ClockState::SessionDone | ClockState::Aborted)
    }

    /// Idle → StimulusOn for trial 0, or TrialClosed(i-1) → StimulusOn(i).
    pub fn begin_trial(&mut self, trial: usize) -> Option<TrialPlan> {
        if trial >= self.total_trials {
            return None;
        }
        let allowed = match self.state {
            ClockState::Idle => trial == 0,
            ClockState::TrialClosed { trial: closed } => trial == closed + 1,
            _ => false,
        };
        if !allowed {
            return None;
        }

        self.state = ClockState::StimulusOn { trial };
        debug!(run_id = self.run_id, trial, "stimulus on");

        let tick = |event| ClockTick {
            run_id: self.run_id,
            trial_index: trial,
            event,
        };
        let mut ticks = vec![(self.timing.stimulus_ms, tick(TrialEvent::StimulusOff))];
        if self.speak_number {
            ticks.push((self.timing.number_delay_ms, tick(TrialEvent::SpeakNumber)));
        }
        ticks.push((self.timing.trial_ms, tick(TrialEvent::TrialClose)));

        Some(TrialPlan {
            trial_index: trial,
            ticks,
        })
    }

    pub fn accept(&mut self, tick: ClockTick) -> Transition {
        if tick.run_id != self.run_id || Some(tick.trial_index) != self.current_trial() {
            return Transition::Stale;
        }
        let trial = tick.trial_index;

        match (tick.event, self.state) {
            (TrialEvent::StimulusOff, ClockState::StimulusOn { .. }) => {
                self.state = ClockState::ResponseOpen { trial };
                debug!(run_id = self.run_id, trial, "stimulus off, window still open");
                Transition::StimulusHidden { trial }
            }
            (TrialEvent::SpeakNumber, ClockState::StimulusOn { .. })
            | (TrialEvent::SpeakNumber, ClockState::ResponseOpen { .. }) => {
                Transition::SpeakNumber { trial }
            }
            (TrialEvent::TrialClose, ClockState::StimulusOn { .. })
            | (TrialEvent::TrialClose, ClockState::ResponseOpen { .. }) => {
                self.state = ClockState::TrialClosed { trial };
                debug!(run_id = self.run_id, trial, "trial closed");
                Transition::Closed { trial }
            }
            _ => Transition::Stale,
        }
    }

    /// TrialClosed → next trial index, or SessionDone after the last one.
    /// The caller starts the next trial with `begin_trial`.
    pub fn advance(&mut self) -> Advance {
        let ClockState::TrialClosed { trial } = self.state else {
            return Advance::NotClosed;
        };
        if trial + 1 < self.total_trials {
            Advance::NextTrial(trial + 1)
        } else {
            self.state = ClockState::SessionDone;
            debug!(run_id = self.run_id, "session done");
            Advance::SessionDone
        }
    }

    /// Moves to the terminal `Aborted` state. False if already finished.
    pub fn abort(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.state = ClockState::Aborted;
        debug!(run_id = self.run_id, "clock aborted");
        true
    }
}

/// Log entry for one closed trial.
#[derive(Debug, Clone, PartialEq)]
pub struct NBackTrial {
    pub index: usize,
    pub stimuli: Vec<Stimulus>,
    pub pressed: ModalitySet,
    pub evaluation: TrialEvaluation,
}
