use chrono::NaiveDate;

use crate::models::DateWindow;

/// Trailing days of commit statistics compared per request.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;
/// Cap on the cross-circle "recent signals" list.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalConfig {
    pub window_days: i64,
    pub recent_limit: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl SignalConfig {
    pub fn new(window_days: i64, recent_limit: usize) -> Self {
        Self {
            window_days,
            recent_limit,
        }
    }

    /// The last `window_days` days up to and including `today`.
    pub fn window_ending(&self, today: NaiveDate) -> DateWindow {
        DateWindow::trailing(today, self.window_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_values() {
        let config = SignalConfig::default();
        assert_eq!(config.window_days, 7);
        assert_eq!(config.recent_limit, 10);
    }

    #[test]
    fn default_window_is_seven_calendar_days() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();
        let window = SignalConfig::default().window_ending(today);
        assert_eq!(window.to_string(), "2026-02-14/2026-02-20");
        assert!(!window.contains(NaiveDate::from_ymd_opt(2026, 2, 13).unwrap()));
    }

    #[test]
    fn window_follows_configured_days() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let window = SignalConfig::new(2, 3).window_ending(today);
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        assert_eq!(window.end, today);
        assert_eq!(window.days(), 2);
    }
}
