//! Session configuration and the optional settings file.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::tasks::nback::{Modality, ModalitySet};

/// Hard ceiling for the lag distance.
pub const MAX_LEVEL_CAP: u8 = 8;

const SETTINGS_FILE: &str = "settings.toml";

/// What one session plays: lag, channels, stream length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub n_level: u8,
    pub modalities: ModalitySet,
    pub total_trials: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            n_level: 1,
            modalities: ModalitySet::of(&[Modality::Position, Modality::Color]),
            total_trials: 20,
        }
    }
}

impl SessionConfig {
    pub fn new(n_level: u8, modalities: ModalitySet, total_trials: usize) -> Self {
        Self {
            n_level,
            modalities,
            total_trials,
        }
    }

    pub fn validate(&self, rules: &AdaptiveRules) -> Result<(), ConfigError> {
        if self.modalities.is_empty() {
            return Err(ConfigError::NoModalities);
        }
        if self.n_level < 1 || self.n_level > rules.max_level {
            return Err(ConfigError::LevelOutOfRange {
                level: self.n_level,
                max: rules.max_level,
            });
        }
        if self.total_trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        Ok(())
    }

    /// Same channels and length, different lag.
    pub fn at_level(self, n_level: u8) -> Self {
        Self { n_level, ..self }
    }
}

/// Per-trial delays, all measured from stimulus onset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialTiming {
    /// Visible/audible duration of the stimulus.
    pub stimulus_ms: u64,
    /// Trial close; the single authoritative timeout.
    pub trial_ms: u64,
    /// Offset of the spoken digit so it does not overlap the spoken letter.
    pub number_delay_ms: u64,
}

impl Default for TrialTiming {
    fn default() -> Self {
        Self {
            stimulus_ms: 500,
            trial_ms: 2500,
            number_delay_ms: 600,
        }
    }
}

impl TrialTiming {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stimulus_ms > self.trial_ms {
            return Err(ConfigError::InvalidTiming {
                stimulus_ms: self.stimulus_ms,
                trial_ms: self.trial_ms,
            });
        }
        // A digit scheduled at or past the close would be cancelled unheard.
        if self.number_delay_ms >= self.trial_ms {
            return Err(ConfigError::NumberDelayTooLong {
                number_delay_ms: self.number_delay_ms,
                trial_ms: self.trial_ms,
            });
        }
        Ok(())
    }
}

/// Repeat rate and the level-adjustment thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveRules {
    pub match_probability: f64,
    /// Overall accuracy at or above this moves up a level.
    pub level_up_at: f64,
    /// Overall accuracy strictly below this moves down a level.
    pub level_down_below: f64,
    pub max_level: u8,
}

impl Default for AdaptiveRules {
    fn default() -> Self {
        Self {
            match_probability: 0.3,
            level_up_at: 85.0,
            level_down_below: 70.0,
            max_level: MAX_LEVEL_CAP,
        }
    }
}

impl AdaptiveRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.match_probability) {
            return Err(ConfigError::InvalidProbability(self.match_probability));
        }
        if self.level_down_below.is_nan()
            || self.level_up_at.is_nan()
            || self.level_down_below > self.level_up_at
        {
            return Err(ConfigError::InvalidThresholds {
                up: self.level_up_at,
                down: self.level_down_below,
            });
        }
        if self.max_level < 1 || self.max_level > MAX_LEVEL_CAP {
            return Err(ConfigError::MaxLevelOutOfRange(self.max_level));
        }
        Ok(())
    }

    pub fn clamp_level(&self, level: i32) -> u8 {
        level.clamp(1, i32::from(self.max_level)) as u8
    }
}

/// Everything a session needs, as read from `settings.toml`.
///
/// ```toml
/// [session]
/// n_level = 2
/// modalities = ["position", "audio"]
///
/// [rules]
/// level_up_at = 90.0
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub session: SessionConfig,
    pub timing: TrialTiming,
    pub rules: AdaptiveRules,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rules.validate()?;
        self.timing.validate()?;
        self.session.validate(&self.rules)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Missing file yields defaults; unreadable or malformed files are errors.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_toml(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn load() -> Result<Self, ConfigError> {
        match default_settings_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }
}

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("place", "Looplace", "dualback")
}

pub fn default_settings_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}
