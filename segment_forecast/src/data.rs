//! Fact table handling for segmented forecasting

use crate::error::{ForecastError, Result};
use crate::utils::date_parser::parse_period;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Column names of the input contract
pub mod columns {
    /// Reporting month
    pub const DATE: &str = "Date";
    /// `QTY` or `USD`
    pub const METRIC: &str = "Metric";
    /// Distribution channel
    pub const CHANNEL: &str = "Channel";
    /// Country code
    pub const COUNTRY: &str = "Country_ID";
    /// Product description
    pub const PRODUCT: &str = "Product";
    /// Reported figure
    pub const VALUE: &str = "Value";

    /// Every column the upstream table must carry
    pub const REQUIRED: [&str; 6] = [DATE, METRIC, CHANNEL, COUNTRY, PRODUCT, VALUE];
}

/// Which figure an observation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Units sold
    #[serde(rename = "QTY")]
    Quantity,
    /// Sales value in USD
    #[serde(rename = "USD")]
    Value,
}

impl Metric {
    /// Code used in the input and output tables
    pub fn code(&self) -> &'static str {
        match self {
            Metric::Quantity => "QTY",
            Metric::Value => "USD",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Metric {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QTY" => Ok(Metric::Quantity),
            "USD" => Ok(Metric::Value),
            other => Err(ForecastError::DataError(format!("Unknown metric '{}'", other))),
        }
    }
}

/// One monthly figure for a (metric, channel, country, product) combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// First day of the reporting month
    pub date: NaiveDate,
    /// Reported metric
    pub metric: Metric,
    /// Distribution channel
    pub channel: String,
    /// Country code
    pub country: String,
    /// Product description
    pub product: String,
    /// Reported figure, `None` when the source left it blank
    pub value: Option<f64>,
}

impl Observation {
    /// Create a new observation
    pub fn new(
        date: NaiveDate,
        metric: Metric,
        channel: impl Into<String>,
        country: impl Into<String>,
        product: impl Into<String>,
        value: Option<f64>,
    ) -> Self {
        Self {
            date,
            metric,
            channel: channel.into(),
            country: country.into(),
            product: product.into(),
            value,
        }
    }
}

/// The unified long-format fact table delivered by the upstream ETL
#[derive(Debug, Clone, Default)]
pub struct FactTable {
    observations: Vec<Observation>,
}

impl FactTable {
    /// Create a fact table from already parsed observations
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// Get the observations
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Latest reporting month across every segment
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.observations.iter().map(|o| o.date).max()
    }
}

/// Loader for the upstream fact table
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load the fact table from a delimited text file
    pub fn from_csv<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<FactTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path.as_ref())
            .map_err(|e| match e.into_kind() {
                csv::ErrorKind::Io(io) => ForecastError::IoError(io),
                other => ForecastError::DataError(format!("{:?}", other)),
            })?;

        let headers = reader.headers()?.clone();
        let positions = Self::locate_columns(headers.iter())?;

        let mut observations = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let field = |idx: usize| record.get(positions[idx]).unwrap_or("");
            let observation = Self::parse_row(
                field(0),
                field(1),
                field(2),
                field(3),
                field(4),
                field(5),
            )
            .map_err(|e| ForecastError::DataError(format!("Row {}: {}", line + 2, e)))?;
            observations.push(observation);
        }

        tracing::debug!(rows = observations.len(), "loaded fact table from csv");
        Ok(FactTable::new(observations))
    }

    /// Create the fact table from an existing DataFrame
    pub fn from_dataframe(df: &DataFrame) -> Result<FactTable> {
        let names = df.get_column_names();
        Self::locate_columns(names.iter().copied())?;

        let text_column = |name: &str| -> Result<Vec<Option<String>>> {
            let series = df.column(name)?.cast(&DataType::Utf8)?;
            let values = series
                .utf8()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect();
            Ok(values)
        };

        let dates = text_column(columns::DATE)?;
        let metrics = text_column(columns::METRIC)?;
        let channels = text_column(columns::CHANNEL)?;
        let countries = text_column(columns::COUNTRY)?;
        let products = text_column(columns::PRODUCT)?;
        let values: Vec<Option<f64>> = df
            .column(columns::VALUE)?
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect();

        let mut observations = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let text = |col: &Vec<Option<String>>| col[row].clone().unwrap_or_default();
            let date = parse_period(&text(&dates))
                .map_err(|e| ForecastError::DataError(format!("Row {}: {}", row, e)))?;
            let metric = text(&metrics).parse::<Metric>()?;
            observations.push(Observation::new(
                date,
                metric,
                text(&channels),
                text(&countries),
                text(&products),
                values[row].filter(|v| !v.is_nan()),
            ));
        }

        Ok(FactTable::new(observations))
    }

    /// Find the position of every required column, failing on the first one missing
    fn locate_columns<'a>(names: impl Iterator<Item = &'a str>) -> Result<[usize; 6]> {
        let names: Vec<&str> = names.collect();
        let mut positions = [0usize; 6];
        for (slot, required) in columns::REQUIRED.iter().enumerate() {
            positions[slot] = names
                .iter()
                .position(|name| name.trim() == *required)
                .ok_or_else(|| ForecastError::MissingUpstreamColumn(required.to_string()))?;
        }
        Ok(positions)
    }

    fn parse_row(
        date: &str,
        metric: &str,
        channel: &str,
        country: &str,
        product: &str,
        value: &str,
    ) -> Result<Observation> {
        let value = if value.is_empty() || value.eq_ignore_ascii_case("nan") {
            None
        } else {
            let parsed = value
                .parse::<f64>()
                .map_err(|_| ForecastError::DataError(format!("Invalid value '{}'", value)))?;
            Some(parsed)
        };

        Ok(Observation::new(
            parse_period(date)?,
            metric.parse()?,
            channel,
            country,
            product,
            value,
        ))
    }
}
