//! # Segment Forecast
//!
//! Segmented monthly forecasting and outlier detection for pharmaceutical
//! distribution figures.
//!
//! ## Features
//!
//! - Splitting a long-format fact table into one series per
//!   (metric, channel, country, product)
//! - Aligning every series to the latest reporting month
//! - Calendar features (quarter, month, year)
//! - Gradient-boosted regression trees fit per segment
//! - One-step back-test with a ±10% outlier rule and a three-month forecast
//! - Parallel scoring with per-segment failure isolation
//!
//! ## Quick Start
//!
//! ```no_run
//! use segment_forecast::{DataLoader, OutlierPipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let table = DataLoader::from_csv("fact_nrc_pharma.csv", b';')?;
//!
//! let report = OutlierPipeline::from_config(&config)?.run(&table)?;
//! report.table.write_csv("NRC_OUTLIERS_AND_FORECAST.csv")?;
//! # Ok::<(), segment_forecast::ForecastError>(())
//! ```

pub mod aggregate;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod metrics;
pub mod models;
pub mod outliers;
pub mod pipeline;
pub mod segment;
pub mod utils;

// Re-export commonly used types
pub use crate::aggregate::{ScoredRow, ScoredTable, SkippedSegment};
pub use crate::config::PipelineConfig;
pub use crate::data::{DataLoader, FactTable, Metric, Observation};
pub use crate::error::{ForecastError, Result};
pub use crate::forecaster::{ForecastRow, SegmentForecast, SegmentForecaster, FORECAST_HORIZON};
pub use crate::models::{Regressor, TrainedRegressor};
pub use crate::outliers::OutlierThreshold;
pub use crate::pipeline::{OutlierPipeline, RunReport};
pub use crate::segment::{GapPolicy, SegmentKey, Segmenter, Series, SeriesPoint};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
