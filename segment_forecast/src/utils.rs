//! Utility functions for the segment_forecast crate

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Months, NaiveDate};

/// Truncate a date to the first day of its month
pub fn month_start(date: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month.
    date.with_day(1).unwrap_or(date)
}

/// Shift a month-start date by `months` calendar months
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    month_start(date)
        .checked_add_months(Months::new(months))
        .ok_or_else(|| {
            ForecastError::DataError(format!("Date {} + {} months is out of range", date, months))
        })
}

/// Create the month-start dates that follow `last` for a forecast horizon
pub fn future_months(last: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>> {
    (1..=horizon as u32).map(|step| add_months(last, step)).collect()
}

/// Number of whole calendar months from `from` to `to` (negative if `to` is earlier)
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

/// Parsing of reporting periods into month-start dates
pub mod date_parser {
    use super::month_start;
    use crate::error::{ForecastError, Result};
    use chrono::NaiveDate;

    /// Parse a reporting period.
    ///
    /// Accepts `YYYY-MM-DD`, `YYYYMMDD` and `YYYYMM`; an optional time part
    /// after the date (`2023-01-01 00:00:00`, `2023-01-01T00:00:00`) is ignored.
    pub fn parse_period(raw: &str) -> Result<NaiveDate> {
        let trimmed = raw.trim();
        let date_part = trimmed
            .split(|c: char| c == ' ' || c == 'T')
            .next()
            .unwrap_or(trimmed);

        let parsed = if date_part.contains('-') {
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
        } else if date_part.len() == 8 {
            NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()
        } else if date_part.len() == 6 {
            NaiveDate::parse_from_str(&format!("{}01", date_part), "%Y%m%d").ok()
        } else {
            None
        };

        parsed
            .map(month_start)
            .ok_or_else(|| ForecastError::DataError(format!("Unrecognised period '{}'", raw)))
    }
}
