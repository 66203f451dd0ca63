//! Run configuration for the outlier and forecast pipeline

use crate::error::{ForecastError, Result};
use crate::models::gradient_boosting::BoostingConfig;
use crate::outliers::OutlierThreshold;
use crate::segment::GapPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides [`IoConfig::data_dir`]
pub const DATA_DIR_ENV: &str = "NRC_DATA_DIR";

/// Where the pipeline reads its fact table and writes the scored table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Working folder holding `input/` and `output/`
    pub data_dir: PathBuf,
    /// Fact table file, relative to `data_dir/input`
    pub input_file: String,
    /// Scored table file, relative to `data_dir/output`
    pub output_file: String,
    /// Field delimiter of the fact table
    pub delimiter: char,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            input_file: "fact_nrc_pharma.csv".to_string(),
            output_file: "NRC_OUTLIERS_AND_FORECAST.csv".to_string(),
            delimiter: ';',
        }
    }
}

impl IoConfig {
    /// Full path of the fact table
    pub fn input_path(&self) -> PathBuf {
        self.data_dir.join("input").join(&self.input_file)
    }

    /// Full path of the scored table
    pub fn output_path(&self) -> PathBuf {
        self.data_dir.join("output").join(&self.output_file)
    }

    /// Delimiter as a single byte
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter).map_err(|_| {
            ForecastError::InvalidParameter(format!(
                "Delimiter '{}' is not a single-byte character",
                self.delimiter
            ))
        })
    }
}

/// Configuration for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Model hyperparameters shared by every segment
    pub boosting: BoostingConfig,
    /// Outlier band
    pub threshold: OutlierThreshold,
    /// Worker threads; 0 = one per core
    pub threads: usize,
    /// Fit budget per segment in milliseconds
    pub segment_timeout_ms: Option<u64>,
    /// Treatment of interior missing months
    pub gap_policy: GapPolicy,
    /// File locations
    pub io: IoConfig,
}

impl PipelineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.io.data_dir = PathBuf::from(dir);
            }
        }
        self
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.boosting.validate()?;
        self.threshold.validate()?;
        self.io.delimiter_byte()?;
        Ok(())
    }

    /// Per-segment fit budget
    pub fn segment_timeout(&self) -> Option<Duration> {
        self.segment_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.boosting.n_estimators, 1000);
        assert_eq!(config.boosting.early_stopping_rounds, Some(50));
        assert_eq!(config.threshold.upper, 1.10);
    }

    #[test]
    fn test_partial_sections() {
        let config = PipelineConfig::from_toml_str(
            r#"
            threads = 4
            segment_timeout_ms = 2000
            gap_policy = "zero_fill"

            [boosting]
            learning_rate = 0.05

            [io]
            delimiter = ","
            "#,
        )
        .unwrap();

        assert_eq!(config.threads, 4);
        assert_eq!(config.segment_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(config.gap_policy, GapPolicy::ZeroFill);
        assert_eq!(config.boosting.learning_rate, 0.05);
        assert_eq!(config.boosting.max_depth, 3);
        assert_eq!(config.io.delimiter_byte().unwrap(), b',');
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(PipelineConfig::from_toml_str("[boosting]\nlearning_rate = 2.0").is_err());
        assert!(PipelineConfig::from_toml_str("[threshold]\nlower = 1.5").is_err());
        assert!(PipelineConfig::from_toml_str("threads = \"many\"").is_err());
    }

    #[test]
    fn test_paths() {
        let io = IoConfig {
            data_dir: PathBuf::from("/data"),
            ..IoConfig::default()
        };
        assert_eq!(io.input_path(), PathBuf::from("/data/input/fact_nrc_pharma.csv"));
        assert_eq!(
            io.output_path(),
            PathBuf::from("/data/output/NRC_OUTLIERS_AND_FORECAST.csv")
        );
    }
}
