//! Regression models over calendar features

use crate::error::Result;
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// Dense feature vector, ordered like [`crate::features::FEATURE_NAMES`]
pub type FeatureVector = [f64; 3];

/// Wall-clock budget for a single fit
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    /// Start a budget now
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Whether the budget is spent
    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }

    /// Milliseconds since the budget started
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Per-call options for [`Regressor::fit`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FitOptions<'a> {
    /// Held-out rows watched for early stopping
    pub validation: Option<(&'a [FeatureVector], &'a [f64])>,
    /// Abort training once this is spent
    pub deadline: Option<Deadline>,
}

impl<'a> FitOptions<'a> {
    /// Watch `features`/`targets` for early stopping
    pub fn with_validation(mut self, features: &'a [FeatureVector], targets: &'a [f64]) -> Self {
        self.validation = Some((features, targets));
        self
    }

    /// Bound the fit by a deadline
    pub fn with_deadline(mut self, deadline: Option<Deadline>) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Trained regression model
pub trait TrainedRegressor: Debug + Send {
    /// Predict one row
    fn predict_one(&self, features: &FeatureVector) -> f64;

    /// Predict a batch of rows
    fn predict(&self, features: &[FeatureVector]) -> Vec<f64> {
        features.iter().map(|f| self.predict_one(f)).collect()
    }

    /// Name of the model
    fn name(&self) -> &str;
}

/// Regression model that can be trained on a feature matrix
pub trait Regressor: Debug + Clone + Send + Sync {
    /// The type of trained model produced
    type Trained: TrainedRegressor;

    /// Train the model
    fn fit(
        &self,
        features: &[FeatureVector],
        targets: &[f64],
        options: FitOptions<'_>,
    ) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod gradient_boosting;
pub mod tree;
