//! Relative-deviation outlier rule for back-tested periods

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Band around the observed value inside which a prediction is unremarkable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierThreshold {
    /// A prediction above `upper * observed` flags the observation
    pub upper: f64,
    /// A prediction below `lower * observed` flags the observation
    pub lower: f64,
}

impl Default for OutlierThreshold {
    fn default() -> Self {
        Self {
            upper: 1.10,
            lower: 0.90,
        }
    }
}

impl OutlierThreshold {
    /// Create a threshold band
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        let threshold = Self { upper, lower };
        threshold.validate()?;
        Ok(threshold)
    }

    /// Check the band is well formed
    pub fn validate(&self) -> Result<()> {
        if !(self.lower.is_finite() && self.upper.is_finite()) || self.lower >= self.upper {
            return Err(ForecastError::InvalidParameter(format!(
                "Outlier band must satisfy lower < upper, got [{}, {}]",
                self.lower, self.upper
            )));
        }
        Ok(())
    }

    /// Whether `prediction` falls strictly outside the band around `observed`
    pub fn is_outlier(&self, observed: f64, prediction: f64) -> bool {
        prediction > self.upper * observed || prediction < self.lower * observed
    }

    /// Classify a row.
    ///
    /// Rows without an observed value have no ground truth and stay unclassified.
    pub fn classify(&self, observed: Option<f64>, prediction: f64) -> Option<bool> {
        observed.map(|value| self.is_outlier(value, prediction))
    }
}
