//! Year-and-month values used to address and navigate the calendar.

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

/// A calendar month, identified by year and month number (1-12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthRef {
    year: i32,
    month: u32,
}

impl MonthRef {
    /// Returns `None` when `month` is outside 1-12 or `year` is outside the
    /// range chrono can represent.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1);
        first.unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let following = self.next().first_day();
        following.pred_opt().unwrap_or(NaiveDate::MAX)
    }

    pub fn prev(&self) -> Self {
        let earlier = self.first_day().checked_sub_months(Months::new(1));
        earlier.map_or(*self, Self::containing)
    }

    pub fn next(&self) -> Self {
        let later = self.first_day().checked_add_months(Months::new(1));
        later.map_or(*self, Self::containing)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_invalid_month() {
        assert!(MonthRef::new(2025, 0).is_none());
        assert!(MonthRef::new(2025, 13).is_none());
        assert!(MonthRef::new(2025, 12).is_some());
    }

    #[test]
    fn first_and_last_day() {
        let feb = MonthRef::new(2024, 2).unwrap();
        assert_eq!(feb.first_day(), date(2024, 2, 1));
        assert_eq!(feb.last_day(), date(2024, 2, 29));

        let feb = MonthRef::new(2025, 2).unwrap();
        assert_eq!(feb.last_day(), date(2025, 2, 28));
    }

    #[test]
    fn prev_and_next_wrap_years() {
        let jan = MonthRef::new(2025, 1).unwrap();
        assert_eq!(jan.prev(), MonthRef::new(2024, 12).unwrap());
        let dec = MonthRef::new(2025, 12).unwrap();
        assert_eq!(dec.next(), MonthRef::new(2026, 1).unwrap());
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(MonthRef::new(2025, 3).unwrap().to_string(), "2025-03");
    }

    #[test]
    fn contains_checks_year_too() {
        let m = MonthRef::new(2025, 3).unwrap();
        assert!(m.contains(date(2025, 3, 31)));
        assert!(!m.contains(date(2024, 3, 31)));
    }
}
