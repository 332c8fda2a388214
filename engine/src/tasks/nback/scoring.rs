//! Per-trial classification and the running per-modality tally.

use serde::{Deserialize, Serialize};

use super::modality::{Modality, ModalitySet, PerModality};
use super::sequence::Sequences;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialOutcome {
    Correct,
    Missed,
    FalsePositive,
    /// No match and no flag. Deliberately left out of the tally.
    Unscored,
}

impl TrialOutcome {
    pub fn classify(is_match: bool, pressed: bool) -> Self {
        match (is_match, pressed) {
            (true, true) => TrialOutcome::Correct,
            (true, false) => TrialOutcome::Missed,
            (false, true) => TrialOutcome::FalsePositive,
            (false, false) => TrialOutcome::Unscored,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTally {
    pub correct: u32,
    pub missed: u32,
    pub false_positive: u32,
}

impl ScoreTally {
    pub fn record(&mut self, outcome: TrialOutcome) {
        match outcome {
            TrialOutcome::Correct => self.correct = self.correct.saturating_add(1),
            TrialOutcome::Missed => self.missed = self.missed.saturating_add(1),
            TrialOutcome::FalsePositive => {
                self.false_positive = self.false_positive.saturating_add(1)
            }
            TrialOutcome::Unscored => {}
        }
    }

    pub fn scored(&self) -> u32 {
        self.correct + self.missed + self.false_positive
    }

    /// `correct / scored` as a percentage; 0 when nothing was scored.
    pub fn accuracy(&self) -> f64 {
        let scored = self.scored();
        if scored == 0 {
            0.0
        } else {
            self.correct as f64 / scored as f64 * 100.0
        }
    }
}

/// Outcomes of one trial; `None` for modalities not in play.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialEvaluation {
    pub trial_index: usize,
    outcomes: PerModality<Option<TrialOutcome>>,
}

impl TrialEvaluation {
    pub fn outcome(&self, modality: Modality) -> Option<TrialOutcome> {
        self.outcomes[modality]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Modality, TrialOutcome)> + '_ {
        Modality::ALL
            .into_iter()
            .filter_map(|modality| self.outcomes[modality].map(|outcome| (modality, outcome)))
    }
}

/// Pure classification of one trial against ground truth. Each modality is
/// judged on its own; there is no per-trial aggregate.
pub fn evaluate(
    trial_index: usize,
    sequences: &Sequences,
    pressed: ModalitySet,
    modalities: ModalitySet,
) -> TrialEvaluation {
    let mut evaluation = TrialEvaluation {
        trial_index,
        ..TrialEvaluation::default()
    };
    for modality in modalities.iter() {
        let is_match = sequences.is_match(modality, trial_index);
        evaluation.outcomes[modality] =
            Some(TrialOutcome::classify(is_match, pressed.contains(modality)));
    }
    evaluation
}

/// Running tallies for a session. Only trial close writes here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBoard {
    tallies: PerModality<ScoreTally>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tally(&self, modality: Modality) -> ScoreTally {
        self.tallies[modality]
    }

    fn apply(&mut self, evaluation: &TrialEvaluation) {
        for (modality, outcome) in evaluation.iter() {
            self.tallies[modality].record(outcome);
        }
    }

    /// Evaluate and fold into the tallies in one step.
    pub fn evaluate_trial(
        &mut self,
        trial_index: usize,
        sequences: &Sequences,
        pressed: ModalitySet,
        modalities: ModalitySet,
    ) -> TrialEvaluation {
        let evaluation = evaluate(trial_index, sequences, pressed, modalities);
        self.apply(&evaluation);
        evaluation
    }
}
