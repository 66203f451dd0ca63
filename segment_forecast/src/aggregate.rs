//! Union of per-segment results into the scored output table

use crate::data::Metric;
use crate::error::Result;
use crate::forecaster::{RowKind, SegmentForecast};
use crate::segment::SegmentKey;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output column names, in order
pub const OUTPUT_COLUMNS: [&str; 8] = [
    "Date",
    "Metric",
    "Channel",
    "Country_ID",
    "Product",
    "Value",
    "Prediction",
    "isOutlier",
];

/// One row of the scored table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRow {
    /// Scored month
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    /// Reported metric
    #[serde(rename = "Metric")]
    pub metric: Metric,
    /// Distribution channel
    #[serde(rename = "Channel")]
    pub channel: String,
    /// Country code
    #[serde(rename = "Country_ID")]
    pub country: String,
    /// Product description
    #[serde(rename = "Product")]
    pub product: String,
    /// Observed figure
    #[serde(rename = "Value")]
    pub value: Option<f64>,
    /// Model prediction
    #[serde(rename = "Prediction")]
    pub prediction: f64,
    /// Outlier flag, absent for unobserved periods
    #[serde(rename = "isOutlier")]
    pub is_outlier: Option<bool>,
    /// Back-test or forecast
    #[serde(skip)]
    pub kind: RowKind,
}

/// A segment left out of the scored table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSegment {
    /// Segment that failed
    pub key: SegmentKey,
    /// Why it failed
    pub reason: String,
}

/// Scored rows of every segment that succeeded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredTable {
    rows: Vec<ScoredRow>,
}

impl ScoredTable {
    /// Union segment results, tagging each row with its segment key
    pub fn from_forecasts(forecasts: impl IntoIterator<Item = SegmentForecast>) -> Self {
        let mut rows = Vec::new();
        for forecast in forecasts {
            let (key, segment_rows) = forecast.into_parts();
            rows.extend(segment_rows.into_iter().map(|row| ScoredRow {
                date: row.date,
                metric: key.metric,
                channel: key.channel.clone(),
                country: key.country.clone(),
                product: key.product.clone(),
                value: row.value,
                prediction: row.prediction,
                is_outlier: row.is_outlier,
                kind: row.kind,
            }));
        }
        Self { rows }
    }

    /// Get the rows
    pub fn rows(&self) -> &[ScoredRow] {
        &self.rows
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows flagged as outliers
    pub fn outliers(&self) -> impl Iterator<Item = &ScoredRow> {
        self.rows.iter().filter(|r| r.is_outlier == Some(true))
    }

    /// Write the table as comma-separated text
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path.as_ref())?;
        writer.write_record(OUTPUT_COLUMNS)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Serialize the rows to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.rows)?)
    }

    /// Convert the table into a DataFrame with the output columns
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self.rows.iter().map(|r| r.date.to_string()).collect();
        let metrics: Vec<&str> = self.rows.iter().map(|r| r.metric.code()).collect();
        let channels: Vec<&str> = self.rows.iter().map(|r| r.channel.as_str()).collect();
        let countries: Vec<&str> = self.rows.iter().map(|r| r.country.as_str()).collect();
        let products: Vec<&str> = self.rows.iter().map(|r| r.product.as_str()).collect();
        let values: Vec<Option<f64>> = self.rows.iter().map(|r| r.value).collect();
        let predictions: Vec<f64> = self.rows.iter().map(|r| r.prediction).collect();
        let outliers: Vec<Option<bool>> = self.rows.iter().map(|r| r.is_outlier).collect();

        let df = DataFrame::new(vec![
            Series::new(OUTPUT_COLUMNS[0], dates),
            Series::new(OUTPUT_COLUMNS[1], metrics),
            Series::new(OUTPUT_COLUMNS[2], channels),
            Series::new(OUTPUT_COLUMNS[3], countries),
            Series::new(OUTPUT_COLUMNS[4], products),
            Series::new(OUTPUT_COLUMNS[5], values),
            Series::new(OUTPUT_COLUMNS[6], predictions),
            Series::new(OUTPUT_COLUMNS[7], outliers),
        ])?;
        Ok(df)
    }
}
