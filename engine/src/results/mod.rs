mod utils;
pub use utils::*;

use time::Date;

use crate::core::storage::{HistoryStore, SessionRecord};

/// Stored sessions for the progress view, newest first, or the load error.
#[derive(Debug, Clone, Default)]
pub struct HistoryState {
    pub records: Vec<SessionRecord>,
    pub error: Option<String>,
}

impl HistoryState {
    pub fn load<H: HistoryStore + ?Sized>(store: &H) -> Self {
        match store.load_all() {
            Ok(mut records) => {
                records.reverse();
                Self {
                    records,
                    error: None,
                }
            }
            Err(err) => Self {
                records: Vec::new(),
                error: Some(format!("Couldn't load summaries: {err}")),
            },
        }
    }

    pub fn today(&self, today: Date) -> Option<TodayStats> {
        today_stats(&self.records, today)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodayStats {
    pub sessions: usize,
    /// Rounded mean of the day's accuracies.
    pub avg_accuracy: u8,
    pub max_level: u8,
}

pub fn today_stats(records: &[SessionRecord], today: Date) -> Option<TodayStats> {
    let todays: Vec<&SessionRecord> = records.iter().filter(|r| r.date == today).collect();
    if todays.is_empty() {
        return None;
    }

    let total: u32 = todays.iter().map(|r| u32::from(r.accuracy)).sum();
    let mean = f64::from(total) / todays.len() as f64;
    let max_level = todays.iter().map(|r| r.n_level).max().unwrap_or(1);

    Some(TodayStats {
        sessions: todays.len(),
        avg_accuracy: crate::tasks::nback::metrics::round_accuracy(mean),
        max_level,
    })
}
