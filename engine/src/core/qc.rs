//! Quality control markers for task sessions. These flags capture context
//! that helps interpret runs.

use serde::{Deserialize, Serialize};

use super::timing::Millis;

/// Callbacks firing later than this count as late.
pub const LATE_TIMER_THRESHOLD_MS: Millis = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityFlags {
    pub late_timer_events: u32,
    pub max_timer_lag_ms: Millis,
    pub stale_callbacks: u32,
}

impl QualityFlags {
    pub fn pristine() -> Self {
        Self::default()
    }

    pub fn log_timer_lag(&mut self, lag_ms: Millis) {
        if lag_ms > LATE_TIMER_THRESHOLD_MS {
            self.late_timer_events = self.late_timer_events.saturating_add(1);
        }
        self.max_timer_lag_ms = self.max_timer_lag_ms.max(lag_ms);
    }

    pub fn log_stale_callback(&mut self) {
        self.stale_callbacks = self.stale_callbacks.saturating_add(1);
    }

    pub fn is_clean(&self) -> bool {
        self.late_timer_events == 0
    }

    pub fn summary(&self) -> String {
        if self.is_clean() {
            "QC: clean run".to_string()
        } else {
            format!(
                "QC: late timers ×{} (worst {} ms)",
                self.late_timer_events, self.max_timer_lag_ms
            )
        }
    }
}
