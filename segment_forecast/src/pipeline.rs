//! Segment fan-out, scoring and aggregation for one run

use crate::aggregate::{ScoredTable, SkippedSegment};
use crate::config::PipelineConfig;
use crate::data::FactTable;
use crate::error::{ForecastError, Result};
use crate::forecaster::{SegmentForecast, SegmentForecaster};
use crate::metrics::BacktestAccuracy;
use crate::models::gradient_boosting::GradientBoosting;
use crate::models::Regressor;
use crate::segment::{GapPolicy, SegmentKey, Segmenter, Series};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::time::Instant;

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Scored rows of every segment that succeeded, ordered by segment key
    pub table: ScoredTable,
    /// Segments left out, with the reason
    pub skipped: Vec<SkippedSegment>,
    /// Number of segments scored
    pub processed: usize,
    /// Back-test accuracy over observed back-test rows
    pub accuracy: Option<BacktestAccuracy>,
}

impl RunReport {
    /// Total number of segments found in the input
    pub fn segments(&self) -> usize {
        self.processed + self.skipped.len()
    }
}

/// Splits the fact table, scores every segment on a worker pool and unions the results
#[derive(Debug, Clone)]
pub struct OutlierPipeline<M: Regressor = GradientBoosting> {
    forecaster: SegmentForecaster<M>,
    gap_policy: GapPolicy,
    threads: usize,
}

impl OutlierPipeline<GradientBoosting> {
    /// Build the pipeline described by a configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let model = GradientBoosting::new(config.boosting.clone())?;
        let forecaster =
            SegmentForecaster::new(model, config.threshold).with_time_budget(config.segment_timeout());
        Ok(Self::new(forecaster, config.gap_policy, config.threads))
    }
}

impl<M: Regressor> OutlierPipeline<M> {
    /// Create a pipeline; `threads = 0` uses one worker per core
    pub fn new(forecaster: SegmentForecaster<M>, gap_policy: GapPolicy, threads: usize) -> Self {
        Self {
            forecaster,
            gap_policy,
            threads,
        }
    }

    /// Score every segment of the fact table.
    ///
    /// Fails only when the table is empty or the worker pool cannot start;
    /// segment failures end up in [`RunReport::skipped`].
    pub fn run(&self, table: &FactTable) -> Result<RunReport> {
        let started = Instant::now();
        let global_max = table.max_date().ok_or(ForecastError::EmptyInput)?;
        let series = Segmenter::split(table)?;
        tracing::info!(
            rows = table.len(),
            segments = series.len(),
            latest = %global_max,
            "segmented fact table"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| ForecastError::ConfigError(format!("Cannot start worker pool: {}", e)))?;

        // Collecting is the barrier: every segment has finished before aggregation.
        let outcomes: Vec<(SegmentKey, Result<SegmentForecast>)> = pool.install(|| {
            series
                .into_par_iter()
                .map(|s| self.score_segment(s, global_max))
                .collect()
        });

        let mut forecasts = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(forecast) => forecasts.push(forecast),
                Err(err) => {
                    if err.is_segment_local() {
                        tracing::warn!(segment = %key, reason = %err, "segment skipped");
                    } else {
                        tracing::error!(segment = %key, reason = %err, "segment failed");
                    }
                    skipped.push(SkippedSegment {
                        key,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let processed = forecasts.len();
        let table = ScoredTable::from_forecasts(forecasts);
        let accuracy = BacktestAccuracy::from_table(&table);

        tracing::info!(
            processed,
            skipped = skipped.len(),
            outliers = table.outliers().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "outlier and forecast run finished"
        );
        if let Some(accuracy) = &accuracy {
            tracing::info!(%accuracy, "back-test accuracy");
        }

        Ok(RunReport {
            table,
            skipped,
            processed,
            accuracy,
        })
    }

    fn score_segment(
        &self,
        series: Series,
        global_max: NaiveDate,
    ) -> (SegmentKey, Result<SegmentForecast>) {
        let key = series.key().clone();
        let outcome = series
            .align_to(global_max)
            .with_gap_policy(self.gap_policy)
            .and_then(|aligned| self.forecaster.forecast(&aligned));
        (key, outcome)
    }
}
