//! Calendar-month arithmetic used throughout the engine.
//!
//! All month shifts are end-of-month safe: walking forward from Jan 31 by one
//! month lands on Feb 28 (or 29), never on an invalid date.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};

/// A calendar month, ordered chronologically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub const fn new(year: i32, month: u32) -> Month {
        debug_assert!(month >= 1 && month <= 12);
        Month { year, month }
    }

    /// The month containing the given date.
    pub fn containing(date: NaiveDate) -> Month {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap()
    }

    pub fn last_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, days_in_month(self.year, self.month))
            .unwrap()
    }

    /// The given day-of-month, clamped to the last valid day.
    pub fn day_clamped(self, day: u32) -> NaiveDate {
        let day = day.max(1).min(days_in_month(self.year, self.month));
        NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap()
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn next(self) -> Month {
        self.shift(1)
    }

    pub fn shift(self, months: i32) -> Month {
        Month::containing(shift_months(self.first_day(), months))
    }

    /// Signed number of months from `other` to `self`.
    pub fn months_since(self, other: Month) -> i32 {
        (self.year - other.year) * 12 + self.month as i32 - other.month as i32
    }

    /// Iterates every month from `self` through `end`, inclusive.
    pub fn through(self, end: Month) -> impl Iterator<Item = Month> {
        let count = if end < self {
            0
        } else {
            end.months_since(self) + 1
        };
        (0..count).map(move |offset| self.shift(offset))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Adds calendar months to a date, clamping the day to the target month.
pub fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 + months;
    let mut day = date.day();
    while month > 12 {
        month -= 12;
        year += 1;
    }
    while month < 1 {
        month += 12;
        year -= 1;
    }
    day = day.min(days_in_month(year, month as u32));
    NaiveDate::from_ymd_opt(year, month as u32, day).unwrap()
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 28).unwrap());
    let last_current = first_next - Duration::days(1);
    last_current.day()
}

pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    Month::containing(date).last_day()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn shift_months_clamps_to_month_end() {
        assert_eq!(shift_months(date(2025, 1, 31), 1), date(2025, 2, 28));
        assert_eq!(shift_months(date(2024, 1, 31), 1), date(2024, 2, 29));
        assert_eq!(shift_months(date(2025, 10, 15), 3), date(2026, 1, 15));
        assert_eq!(shift_months(date(2025, 1, 15), -2), date(2024, 11, 15));
    }

    #[test]
    fn month_iteration_is_inclusive() {
        let months: Vec<Month> = Month::new(2025, 11)
            .through(Month::new(2026, 2))
            .collect();
        assert_eq!(
            months,
            vec![
                Month::new(2025, 11),
                Month::new(2025, 12),
                Month::new(2026, 1),
                Month::new(2026, 2),
            ]
        );
        assert!(Month::new(2025, 5)
            .through(Month::new(2025, 4))
            .next()
            .is_none());
    }

    #[test]
    fn month_bounds_and_clamping() {
        let feb = Month::new(2025, 2);
        assert_eq!(feb.first_day(), date(2025, 2, 1));
        assert_eq!(feb.last_day(), date(2025, 2, 28));
        assert_eq!(feb.day_clamped(31), date(2025, 2, 28));
        assert!(feb.contains(date(2025, 2, 14)));
        assert!(!feb.contains(date(2025, 3, 1)));
        assert_eq!(Month::new(2026, 1).months_since(Month::new(2025, 10)), 3);
    }
}
