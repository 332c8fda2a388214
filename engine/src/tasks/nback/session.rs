//! Session controller: owns every piece of mutable session state and wires
//! the generator, clock, response window and evaluator together.
//!
//! Time is supplied from outside through [`NBackSession::advance_to`], so the
//! same controller runs under a real timer (see `runner`) or a test stepping
//! through virtual milliseconds.

use rand::Rng;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::engine::{Advance, ClockState, ClockTick, NBackTrial, TrialClock, Transition};
use super::metrics::{next_level, LevelChange, NBackMetrics};
use super::modality::{Modality, Stimulus};
use super::response::ResponseWindow;
use super::scoring::{ScoreBoard, ScoreTally};
use super::sequence::Sequences;
use crate::core::config::{SessionConfig, Settings};
use crate::core::error::ConfigError;
use crate::core::qc::{QualityFlags, LATE_TIMER_THRESHOLD_MS};
use crate::core::storage::{HistoryStore, SessionRecord};
use crate::core::timing::{Millis, Timeline};

/// Stimulus output. All calls are fire-and-forget.
pub trait Presenter {
    fn show_stimulus(&mut self, stimulus: Stimulus);
    fn hide_stimulus(&mut self);
    fn speak(&mut self, text: &str);

    fn trial_started(&mut self, _trial_index: usize, _total_trials: usize) {}

    /// Immediate button feedback after an accepted flag.
    fn show_feedback(&mut self, _modality: Modality, _is_match: bool) {}
}

impl<T: Presenter + ?Sized> Presenter for &mut T {
    fn show_stimulus(&mut self, stimulus: Stimulus) {
        (**self).show_stimulus(stimulus);
    }

    fn hide_stimulus(&mut self) {
        (**self).hide_stimulus();
    }

    fn speak(&mut self, text: &str) {
        (**self).speak(text);
    }

    fn trial_started(&mut self, trial_index: usize, total_trials: usize) {
        (**self).trial_started(trial_index, total_trials);
    }

    fn show_feedback(&mut self, modality: Modality, is_match: bool) {
        (**self).show_feedback(modality, is_match);
    }
}

/// Presenter that drops everything; for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPresenter;

impl Presenter for SilentPresenter {
    fn show_stimulus(&mut self, _stimulus: Stimulus) {}
    fn hide_stimulus(&mut self) {}
    fn speak(&mut self, _text: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagResult {
    Match,
    NoMatch,
    /// No open window, or the modality is not in play.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Finished,
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub config: SessionConfig,
    pub metrics: NBackMetrics,
    pub next_level: u8,
    pub level_change: LevelChange,
    pub record: SessionRecord,
    pub trials: Vec<NBackTrial>,
    pub quality: QualityFlags,
    /// Set when the history store refused the record.
    pub persist_warning: Option<String>,
}

pub struct NBackSession<P, H> {
    settings: Settings,
    sequences: Sequences,
    clock: TrialClock,
    window: ResponseWindow,
    board: ScoreBoard,
    trials: Vec<NBackTrial>,
    timeline: Timeline<ClockTick>,
    quality: QualityFlags,
    now_ms: Millis,
    summary: Option<SessionSummary>,
    presenter: P,
    store: H,
}

impl<P: Presenter, H: HistoryStore> NBackSession<P, H> {
    /// Validates, generates fresh sequences, and presents trial 0 at t = 0.
    pub fn start<R: Rng + ?Sized>(
        settings: Settings,
        presenter: P,
        store: H,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let config = settings.session;
        let sequences = Sequences::generate(
            usize::from(config.n_level),
            config.total_trials,
            config.modalities,
            settings.rules.match_probability,
            rng,
        );
        Self::with_sequences(settings, sequences, rng.gen(), presenter, store)
    }

    /// Starts from known sequences, e.g. a replay or a scripted test.
    pub fn with_sequences(
        settings: Settings,
        sequences: Sequences,
        run_id: u64,
        presenter: P,
        store: H,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let config = settings.session;
        for modality in config.modalities.iter() {
            let actual = sequences.stream(modality).len();
            if actual != config.total_trials {
                return Err(ConfigError::SequenceMismatch {
                    modality,
                    expected: config.total_trials,
                    actual,
                });
            }
        }

        let clock = TrialClock::new(
            run_id,
            config.total_trials,
            settings.timing,
            config.modalities.contains(Modality::Number),
        );

        let mut session = Self {
            settings,
            sequences,
            clock,
            window: ResponseWindow::default(),
            board: ScoreBoard::new(),
            trials: Vec::with_capacity(config.total_trials),
            timeline: Timeline::new(),
            quality: QualityFlags::pristine(),
            now_ms: 0,
            summary: None,
            presenter,
            store,
        };

        info!(
            run_id,
            n_level = config.n_level,
            modalities = %config.modalities,
            total_trials = config.total_trials,
            "n-back session started"
        );
        session.begin_trial(0);
        Ok(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.settings.session
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sequences(&self) -> &Sequences {
        &self.sequences
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn current_trial(&self) -> Option<usize> {
        self.clock.current_trial()
    }

    pub fn completed_trials(&self) -> usize {
        self.trials.len()
    }

    pub fn trials(&self) -> &[NBackTrial] {
        &self.trials
    }

    pub fn tally(&self, modality: Modality) -> ScoreTally {
        self.board.tally(modality)
    }

    pub fn quality(&self) -> QualityFlags {
        self.quality
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn store(&self) -> &H {
        &self.store
    }

    pub fn status(&self) -> SessionStatus {
        match self.clock.state() {
            ClockState::SessionDone => SessionStatus::Finished,
            ClockState::Aborted => SessionStatus::Aborted,
            _ => SessionStatus::Running,
        }
    }

    /// Due time of the next pending callback, if any.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.timeline.next_due()
    }

    /// Records a flag for the current trial and reports whether it matches.
    /// Outside an open window this is a silent no-op.
    pub fn flag(&mut self, modality: Modality) -> FlagResult {
        if !self.config().modalities.contains(modality) || !self.clock.is_window_open() {
            return FlagResult::Ignored;
        }
        let Some(trial) = self.window.trial() else {
            return FlagResult::Ignored;
        };
        self.window.flag(modality);

        let is_match = self.sequences.is_match(modality, trial);
        self.presenter.show_feedback(modality, is_match);
        if is_match {
            FlagResult::Match
        } else {
            FlagResult::NoMatch
        }
    }

    /// `Some(is_match)` for a flagged modality in the open trial, else `None`.
    /// Read-only; tallies are untouched.
    pub fn feedback(&self, modality: Modality) -> Option<bool> {
        let trial = self.window.trial()?;
        self.window
            .is_flagged(modality)
            .then(|| self.sequences.is_match(modality, trial))
    }

    /// Fires every callback due at or before `now_ms`, in order.
    pub fn advance_to(&mut self, now_ms: Millis) -> SessionStatus {
        if self.now_ms < now_ms {
            self.now_ms = now_ms;
        }
        while self.status() == SessionStatus::Running {
            let Some(entry) = self.timeline.pop_due(self.now_ms) else {
                break;
            };
            let lag_ms = self.now_ms - entry.due_ms;
            if lag_ms > LATE_TIMER_THRESHOLD_MS {
                warn!(lag_ms, trial = entry.event.trial_index, "timer callback fired late");
            }
            self.quality.log_timer_lag(lag_ms);
            self.fire(entry.event);
        }
        self.status()
    }

    /// Cancels all pending callbacks. Nothing is scored or persisted afterwards.
    pub fn abort(&mut self) -> bool {
        if !self.clock.abort() {
            return false;
        }
        let dropped = self.timeline.cancel_all();
        self.window.close();
        self.presenter.hide_stimulus();
        info!(
            run_id = self.clock.run_id(),
            completed = self.trials.len(),
            dropped_callbacks = dropped,
            "n-back session aborted"
        );
        true
    }

    fn fire(&mut self, tick: ClockTick) {
        match self.clock.accept(tick) {
            Transition::Stale => {
                self.quality.log_stale_callback();
                debug!(?tick, "stale callback dropped");
            }
            Transition::StimulusHidden { .. } => self.presenter.hide_stimulus(),
            Transition::SpeakNumber { trial } => {
                if let Some(stimulus) = self.sequences.stimulus(Modality::Number, trial) {
                    self.presenter.speak(&stimulus.utterance());
                }
            }
            Transition::Closed { trial } => self.close_trial(trial),
        }
    }

    fn begin_trial(&mut self, trial: usize) {
        let Some(plan) = self.clock.begin_trial(trial) else {
            return;
        };
        let modalities = self.config().modalities;
        self.window.open(trial);
        self.presenter.trial_started(trial, self.clock.total_trials());

        for modality in modalities.iter() {
            if let Some(stimulus) = self.sequences.stimulus(modality, trial) {
                self.presenter.show_stimulus(stimulus);
            }
        }
        if let Some(letter) = self.sequences.stimulus(Modality::Audio, trial) {
            if modalities.contains(Modality::Audio) {
                self.presenter.speak(&letter.utterance());
            }
        }

        for (offset, tick) in plan.ticks {
            self.timeline.schedule(self.now_ms + offset, tick);
        }
    }

    fn close_trial(&mut self, trial: usize) {
        // Nothing from this trial outlives its close.
        self.timeline.cancel_all();

        let modalities = self.config().modalities;
        let pressed = self.window.close();
        let evaluation = self
            .board
            .evaluate_trial(trial, &self.sequences, pressed, modalities);
        debug!(trial, ?pressed, ?evaluation, "trial evaluated");

        let stimuli = modalities
            .iter()
            .filter_map(|modality| self.sequences.stimulus(modality, trial))
            .collect();
        self.trials.push(NBackTrial {
            index: trial,
            stimuli,
            pressed,
            evaluation,
        });

        match self.clock.advance() {
            Advance::NextTrial(next) => self.begin_trial(next),
            Advance::SessionDone => self.finish(),
            Advance::NotClosed => {}
        }
    }

    fn finish(&mut self) {
        let config = self.settings.session;
        let rules = self.settings.rules;
        let metrics = NBackMetrics::from_board(&self.board, config.modalities);
        let next = next_level(config.n_level, metrics.overall_accuracy, &rules);

        let record = SessionRecord::new(
            OffsetDateTime::now_utc(),
            config.n_level,
            metrics.rounded_accuracy,
            config.modalities,
        );
        let persist_warning = match self.store.append(&record) {
            Ok(()) => None,
            Err(err) => {
                warn!(error = %err, "session record not persisted; keeping it in memory only");
                Some(format!("Failed to persist summary: {err}"))
            }
        };

        info!(
            run_id = self.clock.run_id(),
            accuracy = metrics.overall_accuracy,
            next_level = next,
            "n-back session finished"
        );

        self.summary = Some(SessionSummary {
            config,
            metrics,
            next_level: next,
            level_change: LevelChange::between(config.n_level, next),
            record,
            trials: self.trials.clone(),
            quality: self.quality,
            persist_warning,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::MemoryStore;
    use crate::tasks::nback::{ModalitySet, Symbol};

    #[derive(Debug, Default)]
    struct Recorder {
        shown: Vec<Stimulus>,
        hidden: usize,
        spoken: Vec<String>,
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
    }

    fn settings(n_level: u8, modalities: ModalitySet, total: usize) -> Settings {
        Settings {
            session: SessionConfig::new(n_level, modalities, total),
            ..Settings::default()
        }
    }

    #[test]
    fn trial_zero_is_presented_at_start() {
        let enabled = ModalitySet::of(&[Modality::Position, Modality::Audio]);
        let seqs = Sequences::from_streams(
            1,
            [
                (Modality::Position, vec![Symbol::new(4); 3]),
                (Modality::Audio, vec![Symbol::new(1); 3]),
            ],
        );
        let session = NBackSession::with_sequences(
            settings(1, enabled, 3),
            seqs,
            1,
            Recorder::default(),
            MemoryStore::new(),
        )
        .unwrap();

        assert_eq!(session.clock_state(), ClockState::StimulusOn { trial: 0 });
        assert_eq!(session.presenter().shown.len(), 2);
        assert_eq!(session.presenter().spoken, vec!["h".to_string()]);
        assert_eq!(session.next_deadline(), Some(500));
    }

    #[test]
    fn spoken_digit_waits_for_delay() {
        let enabled = ModalitySet::of(&[Modality::Number]);
        let seqs = Sequences::from_streams(1, [(Modality::Number, vec![Symbol::new(6); 2])]);
        let mut session = NBackSession::with_sequences(
            settings(1, enabled, 2),
            seqs,
            1,
            Recorder::default(),
            MemoryStore::new(),
        )
        .unwrap();

        session.advance_to(599);
        assert!(session.presenter().spoken.is_empty());
        session.advance_to(600);
        assert_eq!(session.presenter().spoken, vec!["7".to_string()]);
    }

    #[test]
    fn mismatched_sequences_are_rejected() {
        let enabled = ModalitySet::of(&[Modality::Position]);
        let seqs = Sequences::from_streams(1, [(Modality::Position, vec![Symbol::new(0); 3])]);
        let err = NBackSession::with_sequences(
            settings(1, enabled, 5),
            seqs,
            1,
            Recorder::default(),
            MemoryStore::new(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ConfigError::SequenceMismatch {
                expected: 5,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn feedback_reflects_current_trial_only() {
        let enabled = ModalitySet::of(&[Modality::Color]);
        let seqs = Sequences::from_streams(
            1,
            [(
                Modality::Color,
                vec![Symbol::new(0), Symbol::new(0), Symbol::new(3)],
            )],
        );
        let mut session = NBackSession::with_sequences(
            settings(1, enabled, 3),
            seqs,
            1,
            Recorder::default(),
            MemoryStore::new(),
        )
        .unwrap();

        assert_eq!(session.feedback(Modality::Color), None);
        session.advance_to(2500);
        assert_eq!(session.flag(Modality::Color), FlagResult::Match);
        assert_eq!(session.feedback(Modality::Color), Some(true));
        assert_eq!(session.tally(Modality::Color), ScoreTally::default());

        session.advance_to(5000);
        assert_eq!(session.feedback(Modality::Color), None);
        assert_eq!(session.flag(Modality::Color), FlagResult::NoMatch);
        assert_eq!(session.feedback(Modality::Color), Some(false));
    }

    #[test]
    fn disabled_modality_flags_are_ignored() {
        let enabled = ModalitySet::of(&[Modality::Shape]);
        let seqs = Sequences::from_streams(1, [(Modality::Shape, vec![Symbol::new(2); 2])]);
        let mut session = NBackSession::with_sequences(
            settings(1, enabled, 2),
            seqs,
            1,
            Recorder::default(),
            MemoryStore::new(),
        )
        .unwrap();
        assert_eq!(session.flag(Modality::Audio), FlagResult::Ignored);
    }

    #[test]
    fn random_start_produces_full_sequences() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let mut rng = StdRng::seed_from_u64(3);
        let enabled = ModalitySet::of(&[Modality::Position, Modality::Shape]);
        let session = NBackSession::start(
            settings(2, enabled, 20),
            Recorder::default(),
            MemoryStore::new(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(session.sequences().stream(Modality::Position).len(), 20);
        assert_eq!(session.sequences().stream(Modality::Shape).len(), 20);
        assert!(session.sequences().stream(Modality::Color).is_empty());
    }
}
