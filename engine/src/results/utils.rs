use time::macros::format_description;

use crate::core::config::AdaptiveRules;
use crate::core::format;
use crate::core::storage::SessionRecord;
use crate::tasks::nback::AccuracyTier;

pub fn format_timestamp(record: &SessionRecord) -> String {
    let date = record
        .timestamp
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| record.date.to_string());
    let time = record
        .timestamp
        .format(&format_description!("[hour]:[minute]"))
        .unwrap_or_else(|_| "--".to_string());
    format!("{date} · {time} UTC")
}

pub fn tier_label(tier: AccuracyTier) -> &'static str {
    match tier {
        AccuracyTier::LevelUp => "level up",
        AccuracyTier::Hold => "hold",
        AccuracyTier::LevelDown => "level down",
    }
}

/// One line of the progress listing, e.g.
/// `2025-10-14 · 09:30 UTC  3-BACK  88% (level up)  position, audio`.
pub fn record_line(record: &SessionRecord, rules: &AdaptiveRules) -> String {
    let tier = AccuracyTier::of(f64::from(record.accuracy), rules);
    format!(
        "{}  {}  {} ({})  {}",
        format_timestamp(record),
        format::format_level(record.n_level),
        format::format_percent(f64::from(record.accuracy)),
        tier_label(tier),
        record.modalities
    )
}
