//! Cross-sectional decomposition of the fact table into monthly series

use crate::data::{FactTable, Metric};
use crate::error::{ForecastError, Result};
use crate::utils::{add_months, months_between};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of one independent series
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentKey {
    /// Reported metric
    pub metric: Metric,
    /// Distribution channel
    pub channel: String,
    /// Country code
    pub country: String,
    /// Product description
    pub product: String,
}

impl SegmentKey {
    /// Create a new segment key
    pub fn new(
        metric: Metric,
        channel: impl Into<String>,
        country: impl Into<String>,
        product: impl Into<String>,
    ) -> Self {
        Self {
            metric,
            channel: channel.into(),
            country: country.into(),
            product: product.into(),
        }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.metric, self.channel, self.country, self.product
        )
    }
}

/// One month of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// First day of the month
    pub date: NaiveDate,
    /// Observed figure; `None` for the alignment placeholder or a blank source cell
    pub value: Option<f64>,
}

/// How interior missing months are treated before feature construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Leave missing months out of the series
    #[default]
    Keep,
    /// Insert missing months with a value of zero
    ZeroFill,
}

/// A date-ordered univariate series for one segment
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    key: SegmentKey,
    points: Vec<SeriesPoint>,
}

impl Series {
    /// Create a series, sorting points by date.
    ///
    /// Fails if two points share a month.
    pub fn new(key: SegmentKey, mut points: Vec<SeriesPoint>) -> Result<Self> {
        points.sort_by_key(|p| p.date);
        if let Some(pair) = points.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(ForecastError::ValidationError(format!(
                "Segment {} has two rows for {}",
                key, pair[0].date
            )));
        }
        Ok(Self { key, points })
    }

    /// Get the segment key
    pub fn key(&self) -> &SegmentKey {
        &self.key
    }

    /// Get the points in date order
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// Get the number of points, placeholders included
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points that carry an observed value
    pub fn observed_len(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_some()).count()
    }

    /// Date of the last point
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Extend the series to `global_max` with a valueless placeholder.
    ///
    /// A series that already ends at or after `global_max` is returned unchanged,
    /// so applying this twice is the same as applying it once.
    pub fn align_to(mut self, global_max: NaiveDate) -> Self {
        if let Some(last) = self.last_date() {
            if last < global_max {
                self.points.push(SeriesPoint {
                    date: global_max,
                    value: None,
                });
            }
        }
        self
    }

    /// Insert zero-valued months for interior gaps.
    ///
    /// The gap in front of a trailing placeholder is part of the interior and
    /// is filled too; the placeholder itself keeps no value.
    pub fn zero_fill_gaps(mut self) -> Result<Self> {
        let mut filled = Vec::with_capacity(self.points.len());
        for point in self.points.drain(..) {
            if let Some(prev) = filled.last().map(|p: &SeriesPoint| p.date) {
                for step in 1..months_between(prev, point.date) {
                    filled.push(SeriesPoint {
                        date: add_months(prev, step as u32)?,
                        value: Some(0.0),
                    });
                }
            }
            filled.push(point);
        }
        self.points = filled;
        Ok(self)
    }

    /// Apply a gap policy
    pub fn with_gap_policy(self, policy: GapPolicy) -> Result<Self> {
        match policy {
            GapPolicy::Keep => Ok(self),
            GapPolicy::ZeroFill => self.zero_fill_gaps(),
        }
    }
}

/// Splits a fact table into one series per segment present in the data
#[derive(Debug, Clone, Copy, Default)]
pub struct Segmenter;

impl Segmenter {
    /// Split the fact table.
    ///
    /// Only combinations with at least one row are produced, ordered by key.
    /// Rows sharing a key and month are summed; a blank cell only stays blank
    /// if every duplicate is blank.
    pub fn split(table: &FactTable) -> Result<Vec<Series>> {
        if table.is_empty() {
            return Err(ForecastError::EmptyInput);
        }

        let mut groups: BTreeMap<SegmentKey, BTreeMap<NaiveDate, Option<f64>>> = BTreeMap::new();
        for obs in table.observations() {
            let key = SegmentKey::new(
                obs.metric,
                obs.channel.as_str(),
                obs.country.as_str(),
                obs.product.as_str(),
            );
            let months = groups.entry(key).or_default();
            match months.get_mut(&obs.date) {
                Some(existing) => {
                    tracing::warn!(
                        date = %obs.date,
                        metric = %obs.metric,
                        channel = %obs.channel,
                        country = %obs.country,
                        product = %obs.product,
                        "duplicate fact row, summing"
                    );
                    *existing = match (*existing, obs.value) {
                        (Some(a), Some(b)) => Some(a + b),
                        (a, b) => a.or(b),
                    };
                }
                None => {
                    months.insert(obs.date, obs.value);
                }
            }
        }

        groups
            .into_iter()
            .map(|(key, months)| {
                let points = months
                    .into_iter()
                    .map(|(date, value)| SeriesPoint { date, value })
                    .collect();
                Series::new(key, points)
            })
            .collect()
    }
}
