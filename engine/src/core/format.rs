//! Formatting helpers for presenting metrics.

pub fn format_ms(value: f64) -> String {
    format!("{value:.0} ms")
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.0}%")
}

pub fn format_level(level: u8) -> String {
    format!("{level}-BACK")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_are_compact() {
        assert_eq!(format_ms(2500.0), "2500 ms");
        assert_eq!(format_percent(84.6), "85%");
        assert_eq!(format_level(3), "3-BACK");
    }
}
