//! Session accuracy and the adaptive level rule.

use serde::{Deserialize, Serialize};

use super::modality::{Modality, ModalitySet};
use super::scoring::{ScoreBoard, ScoreTally};
use crate::core::config::AdaptiveRules;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalityScore {
    pub modality: Modality,
    pub tally: ScoreTally,
    /// Percentage, 0 when the modality had nothing scored.
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NBackMetrics {
    pub per_modality: Vec<ModalityScore>,
    /// Unweighted mean of the per-modality accuracies.
    pub overall_accuracy: f64,
    pub rounded_accuracy: u8,
    pub response_count: u32,
}

impl NBackMetrics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_board(board: &ScoreBoard, modalities: ModalitySet) -> Self {
        Self::from_tallies(modalities.iter().map(|m| (m, board.tally(m))))
    }

    fn from_tallies(tallies: impl Iterator<Item = (Modality, ScoreTally)>) -> Self {
        let per_modality: Vec<ModalityScore> = tallies
            .map(|(modality, tally)| ModalityScore {
                modality,
                tally,
                accuracy: tally.accuracy(),
            })
            .collect();

        if per_modality.is_empty() {
            return Self::default();
        }

        let overall_accuracy = per_modality.iter().map(|score| score.accuracy).sum::<f64>()
            / per_modality.len() as f64;
        let response_count = per_modality
            .iter()
            .map(|score| score.tally.correct + score.tally.false_positive)
            .sum();

        Self {
            per_modality,
            overall_accuracy,
            rounded_accuracy: round_accuracy(overall_accuracy),
            response_count,
        }
    }

    pub fn score(&self, modality: Modality) -> Option<&ModalityScore> {
        self.per_modality
            .iter()
            .find(|score| score.modality == modality)
    }
}

/// Nearest whole percent, halves rounding up, clamped to 0..=100.
pub fn round_accuracy(accuracy: f64) -> u8 {
    if !accuracy.is_finite() {
        return 0;
    }
    (accuracy + 0.5).floor().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelChange {
    Up,
    Down,
    Same,
}

impl LevelChange {
    pub fn between(from: u8, to: u8) -> Self {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => LevelChange::Up,
            std::cmp::Ordering::Less => LevelChange::Down,
            std::cmp::Ordering::Equal => LevelChange::Same,
        }
    }
}

/// Up one at or above `level_up_at` (capped), down one below
/// `level_down_below` (floored at 1), otherwise unchanged.
pub fn next_level(level: u8, overall_accuracy: f64, rules: &AdaptiveRules) -> u8 {
    if overall_accuracy >= rules.level_up_at {
        level.saturating_add(1).min(rules.max_level)
    } else if overall_accuracy < rules.level_down_below && level > 1 {
        level - 1
    } else {
        level
    }
}

/// Colour band used by the history listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyTier {
    LevelUp,
    Hold,
    LevelDown,
}

impl AccuracyTier {
    pub fn of(accuracy: f64, rules: &AdaptiveRules) -> Self {
        if accuracy >= rules.level_up_at {
            AccuracyTier::LevelUp
        } else if accuracy >= rules.level_down_below {
            AccuracyTier::Hold
        } else {
            AccuracyTier::LevelDown
        }
    }
}
