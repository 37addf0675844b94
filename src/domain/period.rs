use crate::services::error_handling::{ExplorerError, ExplorerResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar month a play falls in, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthPeriod {
    pub year: i32,
    pub month: u32,
}

impl MonthPeriod {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ExplorerResult<Self> {
        if start > end {
            return Err(ExplorerError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Overlap with `other`, if any.
    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(DateRange { start, end })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_display_and_order() {
        let mut months = vec![
            MonthPeriod::new(2023, 11),
            MonthPeriod::new(2022, 12),
            MonthPeriod::new(2023, 2),
        ];
        months.sort();

        let labels: Vec<String> = months.iter().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["2022-12", "2023-02", "2023-11"]);
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = DateRange::new(date(2023, 1, 1), date(2023, 1, 31)).unwrap();

        assert!(range.contains(date(2023, 1, 1)));
        assert!(range.contains(date(2023, 1, 31)));
        assert!(!range.contains(date(2023, 2, 1)));
        assert!(!range.contains(date(2022, 12, 31)));
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(date(2023, 5, 5), date(2023, 5, 5)).unwrap();
        assert!(range.contains(date(2023, 5, 5)));
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let result = DateRange::new(date(2023, 2, 1), date(2023, 1, 1));
        assert!(matches!(result, Err(ExplorerError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_intersect() {
        let a = DateRange::new(date(2023, 1, 1), date(2023, 6, 30)).unwrap();
        let b = DateRange::new(date(2023, 3, 1), date(2023, 12, 31)).unwrap();
        let c = DateRange::new(date(2024, 1, 1), date(2024, 1, 2)).unwrap();

        let overlap = a.intersect(&b).unwrap();
        assert_eq!(overlap.start(), date(2023, 3, 1));
        assert_eq!(overlap.end(), date(2023, 6, 30));
        assert!(a.intersect(&c).is_none());
    }
}
