//! Trading-calendar oracle for choosing scan dates.
//!
//! The scanner itself never consults a calendar; it matches whatever date
//! it is handed against bar dates. Callers use a calendar to turn "now"
//! into the most recent completed session first.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};

/// Decides which calendar dates are trading sessions.
pub trait TradingCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool;

    /// Most recent trading day at or before `date`.
    fn last_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date;
        while !self.is_trading_day(day) {
            match day.pred_opt() {
                Some(prev) => day = prev,
                None => break,
            }
        }
        day
    }
}

/// Monday-to-Friday calendar with an explicit holiday list.
#[derive(Debug, Clone, Default)]
pub struct WeekdayCalendar {
    holidays: HashSet<NaiveDate>,
}

impl WeekdayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays<I>(holidays: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }
}

impl TradingCalendar for WeekdayCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekdays_trade_weekends_do_not() {
        let calendar = WeekdayCalendar::new();
        assert!(calendar.is_trading_day(date(2024, 6, 5))); // Wednesday
        assert!(calendar.is_trading_day(date(2024, 6, 7))); // Friday
        assert!(!calendar.is_trading_day(date(2024, 6, 8))); // Saturday
        assert!(!calendar.is_trading_day(date(2024, 6, 9))); // Sunday
    }

    #[test]
    fn test_holidays_close_the_market() {
        let calendar = WeekdayCalendar::with_holidays([date(2024, 6, 10)]);
        assert!(!calendar.is_trading_day(date(2024, 6, 10))); // Monday holiday
        assert!(calendar.is_trading_day(date(2024, 6, 11)));
    }

    #[test]
    fn test_last_trading_day_walks_back_over_weekend() {
        let calendar = WeekdayCalendar::new();
        assert_eq!(calendar.last_trading_day(date(2024, 6, 9)), date(2024, 6, 7));
    }

    #[test]
    fn test_last_trading_day_skips_holiday_and_weekend() {
        let calendar = WeekdayCalendar::with_holidays([date(2024, 6, 10)]);
        assert_eq!(calendar.last_trading_day(date(2024, 6, 10)), date(2024, 6, 7));
    }

    #[test]
    fn test_last_trading_day_is_identity_on_sessions() {
        let calendar = WeekdayCalendar::new();
        assert_eq!(calendar.last_trading_day(date(2024, 6, 5)), date(2024, 6, 5));
    }
}
