//! Calendar features derived from the month index

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Feature names in the column order used by the models
pub const FEATURE_NAMES: [&str; 3] = ["quarter", "month", "year"];

/// Calendar features for one month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Quarter of the year, 1 to 4
    pub quarter: u32,
    /// Month of the year, 1 to 12
    pub month: u32,
    /// Calendar year
    pub year: i32,
}

impl FeatureRow {
    /// Derive the features of a date
    pub fn from_date(date: NaiveDate) -> Self {
        let month = date.month();
        Self {
            quarter: (month - 1) / 3 + 1,
            month,
            year: date.year(),
        }
    }

    /// Features as a dense vector, ordered like [`FEATURE_NAMES`]
    pub fn to_vec(&self) -> [f64; 3] {
        [self.quarter as f64, self.month as f64, self.year as f64]
    }
}

/// Build the feature matrix for a sequence of dates
pub fn build_features(dates: &[NaiveDate]) -> Vec<[f64; 3]> {
    dates
        .iter()
        .map(|d| FeatureRow::from_date(*d).to_vec())
        .collect()
}
