//! Calendar month keys for financial periods.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A (year, month) bucket to which financial mutations are attributed.
///
/// Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
}

impl YearMonth {
    /// Creates a month key, returning `None` when `month` is outside 1-12.
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if month >= 1 && month <= 12 {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Returns the month containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Returns the first day of the month.
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Returns the last day of the month.
    #[must_use]
    pub fn last_day(self) -> Option<NaiveDate> {
        self.next().first_day().and_then(|d| d.pred_opt())
    }

    /// Returns the following month.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Returns true if `date` falls inside this month.
    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        Self::from_date(date) == self
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_month() {
        assert!(YearMonth::new(2024, 0).is_none());
        assert!(YearMonth::new(2024, 13).is_none());
        assert_eq!(
            YearMonth::new(2024, 3),
            Some(YearMonth {
                year: 2024,
                month: 3
            })
        );
    }

    #[rstest]
    #[case(2024, 1, date(2024, 1, 31))]
    #[case(2024, 2, date(2024, 2, 29))]
    #[case(2026, 2, date(2026, 2, 28))]
    #[case(2026, 4, date(2026, 4, 30))]
    #[case(2026, 12, date(2026, 12, 31))]
    fn test_last_day(#[case] year: i32, #[case] month: u32, #[case] expected: NaiveDate) {
        let ym = YearMonth::new(year, month).unwrap();
        assert_eq!(ym.last_day(), Some(expected));
    }

    #[test]
    fn test_next_rolls_over_year() {
        let dec = YearMonth::new(2024, 12).unwrap();
        assert_eq!(dec.next(), YearMonth::new(2025, 1).unwrap());
    }

    #[test]
    fn test_from_date_and_contains() {
        let ym = YearMonth::from_date(date(2024, 3, 31));
        assert_eq!(ym.to_string(), "2024-03");
        assert!(ym.contains(date(2024, 3, 1)));
        assert!(!ym.contains(date(2024, 4, 1)));
    }

    #[test]
    fn test_ordering_is_chronological() {
        let a = YearMonth::new(2023, 12).unwrap();
        let b = YearMonth::new(2024, 1).unwrap();
        assert!(a < b);
    }
}
