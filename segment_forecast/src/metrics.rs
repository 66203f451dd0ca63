//! Metrics for evaluating back-test performance across segments

use crate::aggregate::ScoredTable;
use crate::error::{ForecastError, Result};
use crate::forecaster::RowKind;
use serde::Serialize;

/// Back-test accuracy over every segment with an observed last period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestAccuracy {
    /// Number of back-test rows with an observation
    pub evaluated: usize,
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error, over rows with a non-zero observation
    pub mape: f64,
    /// Share of evaluated rows flagged as outliers, in percent
    pub outlier_rate: f64,
}

/// Calculate accuracy metrics for predictions vs actual values
pub fn backtest_accuracy(predictions: &[f64], actual: &[f64], outliers: usize) -> Result<BacktestAccuracy> {
    if predictions.len() != actual.len() || predictions.is_empty() {
        return Err(ForecastError::ValidationError(
            "Predictions and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = predictions.len() as f64;
    let errors: Vec<f64> = predictions
        .iter()
        .zip(actual)
        .map(|(&p, &a)| a - p)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let rmse = (errors.iter().map(|e| e.powi(2)).sum::<f64>() / n).sqrt();

    let percentage: Vec<f64> = actual
        .iter()
        .zip(&errors)
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| e.abs() / a.abs() * 100.0)
        .collect();
    let mape = if percentage.is_empty() {
        0.0
    } else {
        percentage.iter().sum::<f64>() / percentage.len() as f64
    };

    Ok(BacktestAccuracy {
        evaluated: predictions.len(),
        mae,
        rmse,
        mape,
        outlier_rate: outliers as f64 / n * 100.0,
    })
}

impl BacktestAccuracy {
    /// Evaluate the observed back-test rows of a scored table; `None` if there are none
    pub fn from_table(table: &ScoredTable) -> Option<Self> {
        let mut predictions = Vec::new();
        let mut actual = Vec::new();
        let mut outliers = 0;
        for row in table.rows() {
            if row.kind != RowKind::Backtest {
                continue;
            }
            if let Some(value) = row.value {
                predictions.push(row.prediction);
                actual.push(value);
                if row.is_outlier == Some(true) {
                    outliers += 1;
                }
            }
        }
        backtest_accuracy(&predictions, &actual, outliers).ok()
    }
}

impl std::fmt::Display for BacktestAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "evaluated={} mae={:.4} rmse={:.4} mape={:.2}% outliers={:.2}%",
            self.evaluated, self.mae, self.rmse, self.mape, self.outlier_rate
        )
    }
}
