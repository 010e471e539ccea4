use crate::config::FetchMode;
use chrono::{Duration, NaiveDate};

/// Shortest lookback requested from either API.
const MIN_LOOKBACK_DAYS: usize = 7;

/// The date range requested from both APIs and how many days to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub retained_days: usize,
}

impl FetchWindow {
    /// Requests twice the retained span (at least a week) ending at `today`.
    pub fn for_mode(mode: FetchMode, today: NaiveDate) -> Self {
        let retained_days = mode.retained_days();
        let lookback = (retained_days * 2).max(MIN_LOOKBACK_DAYS);
        Self {
            start: today - Duration::days(lookback as i64),
            end: today,
            retained_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_window_requests_double_span() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let window = FetchWindow::for_mode(FetchMode::History, today);
        assert_eq!(window.retained_days, 90);
        assert_eq!(window.end, today);
        assert_eq!((window.end - window.start).num_days(), 180);
    }

    #[test]
    fn daily_window_keeps_a_week_of_a_fortnight() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let window = FetchWindow::for_mode(FetchMode::Daily, today);
        assert_eq!(window.retained_days, 7);
        assert_eq!((window.end - window.start).num_days(), 14);
    }
}
