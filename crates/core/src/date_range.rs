//! Acquisition date ranges

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// A half-open date range `[start, end)`.
///
/// `start` is inclusive and `end` is exclusive, so `2015-01-01/2020-01-01`
/// keeps every acquisition of 2015 through 2019 and nothing from 2020.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Fails with [`Error::InvalidDateRange`] unless `start < end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse two ISO-8601 dates (`YYYY-MM-DD`)
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |name: &'static str, s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| Error::InvalidParameter {
                name,
                value: s.to_string(),
                reason: e.to_string(),
            })
        };
        Self::new(parse("dateRangeStart", start)?, parse("dateRangeEnd", end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// `start <= date < end`
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_bounds_are_inclusive_exclusive() {
        let range = DateRange::parse("2015-01-01", "2020-01-01").unwrap();
        assert!(range.contains(d(2015, 1, 1)));
        assert!(range.contains(d(2019, 12, 31)));
        assert!(!range.contains(d(2020, 1, 1)));
        assert!(!range.contains(d(2014, 12, 31)));
    }

    #[test]
    fn test_start_must_precede_end() {
        assert!(matches!(
            DateRange::parse("2020-01-01", "2020-01-01"),
            Err(Error::InvalidDateRange { .. })
        ));
        assert!(matches!(
            DateRange::parse("2021-08-01", "2018-01-01"),
            Err(Error::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_dates() {
        assert!(matches!(
            DateRange::parse("2018-13-01", "2021-08-01"),
            Err(Error::InvalidParameter { name: "dateRangeStart", .. })
        ));
    }
}
