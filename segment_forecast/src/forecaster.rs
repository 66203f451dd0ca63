//! Per-segment back-test and three-month forecast

use crate::error::{ForecastError, Result};
use crate::features::FeatureRow;
use crate::models::{Deadline, FeatureVector, FitOptions, Regressor, TrainedRegressor};
use crate::outliers::OutlierThreshold;
use crate::segment::{SegmentKey, Series, SeriesPoint};
use crate::utils::future_months;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of months forecast past the last period of a series
pub const FORECAST_HORIZON: usize = 3;

/// Role of a scored row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    /// Last period of the series, predicted by a model that never saw it
    #[default]
    Backtest,
    /// Future period predicted by the model fit on all history
    Forecast,
}

/// One scored period of a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    /// First day of the month
    pub date: NaiveDate,
    /// Observed figure, if any
    pub value: Option<f64>,
    /// Model prediction
    pub prediction: f64,
    /// Outlier flag; `None` when there is no observation to compare
    pub is_outlier: Option<bool>,
    /// Back-test or forecast
    pub kind: RowKind,
}


/// Scored rows of one segment: the back-test row followed by the forecast horizon
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentForecast {
    key: SegmentKey,
    rows: Vec<ForecastRow>,
}

impl SegmentForecast {
    /// Get the segment key
    pub fn key(&self) -> &SegmentKey {
        &self.key
    }

    /// Get every row in date order
    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    /// Get the back-test row
    pub fn backtest(&self) -> &ForecastRow {
        &self.rows[0]
    }

    /// Get the forecast rows
    pub fn forecasts(&self) -> &[ForecastRow] {
        &self.rows[1..]
    }

    /// Consume into the key and rows
    pub fn into_parts(self) -> (SegmentKey, Vec<ForecastRow>) {
        (self.key, self.rows)
    }
}

/// Fits the back-test and full-history models for a series
#[derive(Debug, Clone)]
pub struct SegmentForecaster<M: Regressor> {
    model: M,
    threshold: OutlierThreshold,
    time_budget: Option<Duration>,
}

fn observed_rows(points: &[SeriesPoint]) -> (Vec<FeatureVector>, Vec<f64>) {
    points
        .iter()
        .filter_map(|p| p.value.map(|v| (FeatureRow::from_date(p.date).to_vec(), v)))
        .unzip()
}

/// Attach the segment key to a model failure
fn segment_error(key: &SegmentKey, err: ForecastError) -> ForecastError {
    match err {
        ForecastError::FitTimeout { elapsed_ms, .. } => ForecastError::FitTimeout {
            key: key.to_string(),
            elapsed_ms,
        },
        other => ForecastError::ModelFit {
            key: key.to_string(),
            reason: other.to_string(),
        },
    }
}

impl<M: Regressor> SegmentForecaster<M> {
    /// Create a forecaster around one model configuration
    pub fn new(model: M, threshold: OutlierThreshold) -> Self {
        Self {
            model,
            threshold,
            time_budget: None,
        }
    }

    /// Bound the time spent fitting one segment
    pub fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.time_budget = budget;
        self
    }

    /// Get the model
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Back-test the last period and forecast the next [`FORECAST_HORIZON`] months.
    ///
    /// The series is expected to be aligned already; a trailing placeholder
    /// becomes the back-test row and is predicted without being classified.
    pub fn forecast(&self, series: &Series) -> Result<SegmentForecast> {
        let key = series.key();
        let points = series.points();
        let (history, last) = match points {
            [history @ .., last] if !history.is_empty() => (history, *last),
            _ => {
                return Err(ForecastError::InsufficientHistory {
                    key: key.to_string(),
                    observations: points.len(),
                })
            }
        };
        let deadline = self.time_budget.map(Deadline::after);

        // Back-test: train on everything but the last period, early-stop on it.
        let (train_x, train_y) = observed_rows(history);
        let test_x = [FeatureRow::from_date(last.date).to_vec()];
        let test_y: Vec<f64> = last.value.into_iter().collect();
        // An unobserved last period has nothing to early-stop on.
        let backtest_options = match last.value {
            Some(_) => FitOptions::default().with_validation(&test_x, &test_y),
            None => FitOptions::default(),
        };
        let backtest_model = self
            .model
            .fit(&train_x, &train_y, backtest_options.with_deadline(deadline))
            .map_err(|e| segment_error(key, e))?;
        let backtest_prediction = backtest_model.predict_one(&test_x[0]).ceil();

        // Full fit: the same configuration, now including the last period.
        let (all_x, all_y) = observed_rows(points);
        let full_model = self
            .model
            .fit(
                &all_x,
                &all_y,
                FitOptions::default()
                    .with_validation(&all_x, &all_y)
                    .with_deadline(deadline),
            )
            .map_err(|e| segment_error(key, e))?;

        let mut rows = Vec::with_capacity(FORECAST_HORIZON + 1);
        rows.push(ForecastRow {
            date: last.date,
            value: last.value,
            prediction: backtest_prediction,
            is_outlier: self.threshold.classify(last.value, backtest_prediction),
            kind: RowKind::Backtest,
        });
        for date in future_months(last.date, FORECAST_HORIZON)? {
            let features = FeatureRow::from_date(date).to_vec();
            rows.push(ForecastRow {
                date,
                value: None,
                prediction: full_model.predict_one(&features),
                is_outlier: None,
                kind: RowKind::Forecast,
            });
        }

        tracing::debug!(
            segment = %key,
            model = full_model.name(),
            history = points.len(),
            backtest = backtest_prediction,
            "segment scored"
        );

        Ok(SegmentForecast {
            key: key.clone(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Metric;
    use crate::models::gradient_boosting::{BoostingConfig, GradientBoosting};

    fn forecaster() -> SegmentForecaster<GradientBoosting> {
        SegmentForecaster::new(
            GradientBoosting::new(BoostingConfig::default()).unwrap(),
            OutlierThreshold::default(),
        )
    }

    fn series(values: &[Option<f64>]) -> Series {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint {
                date: crate::utils::add_months(start, i as u32).unwrap(),
                value: *v,
            })
            .collect();
        Series::new(SegmentKey::new(Metric::Quantity, "Retail", "MX", "X"), points).unwrap()
    }

    #[test]
    fn test_single_point_is_insufficient() {
        let result = forecaster().forecast(&series(&[Some(1.0)]));
        match result {
            Err(ForecastError::InsufficientHistory { key, observations }) => {
                assert_eq!(key, "QTY/Retail/MX/X");
                assert_eq!(observations, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_placeholder_backtest_is_unclassified() {
        let result = forecaster()
            .forecast(&series(&[Some(100.0), Some(100.0), None]))
            .unwrap();
        assert_eq!(result.rows().len(), 4);
        assert_eq!(result.backtest().value, None);
        assert_eq!(result.backtest().is_outlier, None);
        assert!(result.backtest().prediction.is_finite());
    }

    #[test]
    fn test_placeholder_keeps_full_horizon() {
        let result = forecaster()
            .forecast(&series(&[Some(40.0), Some(42.0), Some(41.0), None]))
            .unwrap();
        assert_eq!(result.backtest().kind, RowKind::Backtest);
        let dates: Vec<_> = result.forecasts().iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2022, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2022, 7, 1).unwrap(),
            ]
        );
        assert!(result.forecasts().iter().all(|r| r.is_outlier.is_none()));
    }

    #[test]
    fn test_no_observed_history_is_model_fit_error() {
        let result = forecaster().forecast(&series(&[None, Some(5.0)]));
        assert!(matches!(result, Err(ForecastError::ModelFit { .. })));
    }

    #[test]
    fn test_zero_budget_times_out() {
        let slow = forecaster().with_time_budget(Some(Duration::ZERO));
        let result = slow.forecast(&series(&[Some(1.0), Some(2.0), Some(3.0)]));
        assert!(matches!(result, Err(ForecastError::FitTimeout { .. })));
    }
}
