//! Gradient-boosted regression trees with a squared-error objective

use crate::error::{ForecastError, Result};
use crate::models::tree::{RegressionTree, TreeParams};
use crate::models::{FeatureVector, FitOptions, Regressor, TrainedRegressor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Boosting hyperparameters, shared by every fit in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    /// Maximum number of boosting rounds
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Shrinkage applied to each tree
    pub learning_rate: f64,
    /// Stop after this many rounds without validation improvement
    pub early_stopping_rounds: Option<usize>,
    /// Initial prediction for every row
    pub base_score: f64,
    /// L2 penalty on leaf weights
    pub l2_regularization: f64,
    /// Minimum hessian sum in a child
    pub min_child_weight: f64,
    /// Minimum loss reduction required to split
    pub min_split_gain: f64,
    /// Fraction of rows sampled for each tree
    pub subsample: f64,
    /// Seed for row sampling
    pub seed: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 1000,
            max_depth: 3,
            learning_rate: 0.01,
            early_stopping_rounds: Some(50),
            base_score: 0.5,
            l2_regularization: 1.0,
            min_child_weight: 1.0,
            min_split_gain: 0.0,
            subsample: 1.0,
            seed: 0,
        }
    }
}

impl BoostingConfig {
    /// Check that every parameter is in range
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_depth must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ForecastError::InvalidParameter(
                "learning_rate must be in (0, 1]".to_string(),
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ForecastError::InvalidParameter(
                "subsample must be in (0, 1]".to_string(),
            ));
        }
        if self.early_stopping_rounds == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "early_stopping_rounds must be positive when set".to_string(),
            ));
        }
        if self.l2_regularization < 0.0 || self.min_child_weight < 0.0 || self.min_split_gain < 0.0
        {
            return Err(ForecastError::InvalidParameter(
                "regularization terms must be non-negative".to_string(),
            ));
        }
        if !self.base_score.is_finite() {
            return Err(ForecastError::InvalidParameter(
                "base_score must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            l2_regularization: self.l2_regularization,
            min_child_weight: self.min_child_weight,
            min_split_gain: self.min_split_gain,
        }
    }
}

/// Gradient boosting regressor
#[derive(Debug, Clone)]
pub struct GradientBoosting {
    /// Name of the model
    name: String,
    /// Hyperparameters
    config: BoostingConfig,
}

/// Trained gradient boosting regressor
#[derive(Debug, Clone)]
pub struct TrainedGradientBoosting {
    /// Name of the model
    name: String,
    /// Initial prediction
    base_score: f64,
    /// Shrinkage applied to each tree
    learning_rate: f64,
    /// Boosting stages, truncated to the best validation round
    trees: Vec<RegressionTree>,
    /// Validation MSE at the kept round, if a validation set was watched
    best_score: Option<f64>,
}

impl GradientBoosting {
    /// Create a new gradient boosting model
    pub fn new(config: BoostingConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            name: format!(
                "Gradient Boosting (trees={}, depth={}, eta={})",
                config.n_estimators, config.max_depth, config.learning_rate
            ),
            config,
        })
    }

    /// Get the hyperparameters
    pub fn config(&self) -> &BoostingConfig {
        &self.config
    }

    fn sample_rows(&self, rng: &mut StdRng, n: usize) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n).collect();
        }
        let amount = ((n as f64 * self.config.subsample).round() as usize).clamp(1, n);
        let mut rows = rand::seq::index::sample(rng, n, amount).into_vec();
        rows.sort_unstable();
        rows
    }
}

fn mean_squared_error(predictions: &[f64], targets: &[f64]) -> f64 {
    predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / targets.len() as f64
}

impl Regressor for GradientBoosting {
    type Trained = TrainedGradientBoosting;

    fn fit(
        &self,
        features: &[FeatureVector],
        targets: &[f64],
        options: FitOptions<'_>,
    ) -> Result<Self::Trained> {
        if features.len() != targets.len() {
            return Err(ForecastError::ValidationError(format!(
                "Feature rows ({}) don't match targets ({})",
                features.len(),
                targets.len()
            )));
        }
        if targets.is_empty() {
            return Err(ForecastError::DataError(
                "No observed rows to train on".to_string(),
            ));
        }
        if targets.iter().any(|t| !t.is_finite()) {
            return Err(ForecastError::DataError(
                "Training targets must be finite".to_string(),
            ));
        }

        let validation = match options.validation {
            Some((vx, vy)) if vx.len() != vy.len() => {
                return Err(ForecastError::ValidationError(
                    "Validation features and targets differ in length".to_string(),
                ))
            }
            Some((vx, vy)) if !vy.is_empty() => Some((vx, vy)),
            _ => None,
        };

        let n = targets.len();
        let params = self.config.tree_params();
        let lr = self.config.learning_rate;
        let hessians = vec![1.0; n];
        let mut predictions = vec![self.config.base_score; n];
        let mut gradients = vec![0.0; n];
        let mut val_predictions =
            validation.map(|(vx, _)| vec![self.config.base_score; vx.len()]);
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let mut trees = Vec::with_capacity(self.config.n_estimators);
        let mut best: Option<(usize, f64)> = None;

        for round in 0..self.config.n_estimators {
            if let Some(deadline) = options.deadline {
                if deadline.expired() {
                    return Err(ForecastError::FitTimeout {
                        key: String::new(),
                        elapsed_ms: deadline.elapsed_ms(),
                    });
                }
            }

            for ((g, p), t) in gradients.iter_mut().zip(&predictions).zip(targets) {
                *g = p - t;
            }

            let rows = self.sample_rows(&mut rng, n);
            let tree = RegressionTree::fit(features, &gradients, &hessians, &rows, &params);

            for (p, x) in predictions.iter_mut().zip(features) {
                *p += lr * tree.predict(x);
            }

            if let (Some((vx, vy)), Some(vp)) = (validation, val_predictions.as_mut()) {
                for (p, x) in vp.iter_mut().zip(vx) {
                    *p += lr * tree.predict(x);
                }
                let score = mean_squared_error(vp, vy);
                if best.map_or(true, |(_, b)| score < b) {
                    best = Some((round, score));
                }
            }
            trees.push(tree);

            if let (Some(patience), Some((best_round, _))) =
                (self.config.early_stopping_rounds, best)
            {
                if round - best_round >= patience {
                    tracing::trace!(round, best_round, "early stopping");
                    break;
                }
            }
        }

        if let Some((best_round, _)) = best {
            trees.truncate(best_round + 1);
        }

        Ok(TrainedGradientBoosting {
            name: self.name.clone(),
            base_score: self.config.base_score,
            learning_rate: lr,
            trees,
            best_score: best.map(|(_, s)| s),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedGradientBoosting {
    /// Number of boosting stages kept
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Validation MSE at the kept round
    pub fn best_score(&self) -> Option<f64> {
        self.best_score
    }
}

impl TrainedRegressor for TrainedGradientBoosting {
    fn predict_one(&self, features: &FeatureVector) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|t| self.learning_rate * t.predict(features))
                .sum::<f64>()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn monthly_features(n: usize) -> Vec<FeatureVector> {
        (0..n)
            .map(|i| {
                let month = (i % 12) as f64 + 1.0;
                let quarter = ((i % 12) / 3) as f64 + 1.0;
                [quarter, month, 2020.0 + (i / 12) as f64]
            })
            .collect()
    }

    #[test]
    fn test_constant_target_converges() {
        let x = monthly_features(24);
        let y = vec![100.0; 24];
        let model = GradientBoosting::new(BoostingConfig::default()).unwrap();
        let trained = model.fit(&x, &y, FitOptions::default()).unwrap();

        assert_eq!(trained.n_trees(), 1000);
        assert_relative_eq!(trained.predict_one(&x[0]), 100.0, max_relative = 0.01);
    }

    #[test]
    fn test_learns_seasonal_step() {
        let x = monthly_features(36);
        let y: Vec<f64> = x
            .iter()
            .map(|f| if f[1] == 12.0 { 300.0 } else { 100.0 })
            .collect();
        let config = BoostingConfig {
            learning_rate: 0.1,
            ..BoostingConfig::default()
        };
        let trained = GradientBoosting::new(config)
            .unwrap()
            .fit(&x, &y, FitOptions::default())
            .unwrap();

        assert_relative_eq!(trained.predict_one(&x[11]), 300.0, max_relative = 0.05);
        assert_relative_eq!(trained.predict_one(&x[5]), 100.0, max_relative = 0.05);
    }

    #[test]
    fn test_early_stopping_truncates() {
        let x = monthly_features(12);
        let y = vec![10.0; 12];
        // The validation target sits below the base score, so every round moves away from it.
        let vx = [x[0]];
        let vy = [0.0];
        let trained = GradientBoosting::new(BoostingConfig::default())
            .unwrap()
            .fit(&x, &y, FitOptions::default().with_validation(&vx, &vy))
            .unwrap();

        assert_eq!(trained.n_trees(), 1);
        assert!(trained.best_score().is_some());
    }

    #[test]
    fn test_invalid_config() {
        let bad = BoostingConfig {
            learning_rate: 0.0,
            ..BoostingConfig::default()
        };
        assert!(GradientBoosting::new(bad).is_err());

        let bad = BoostingConfig {
            max_depth: 0,
            ..BoostingConfig::default()
        };
        assert!(GradientBoosting::new(bad).is_err());
    }

    #[test]
    fn test_rejects_empty_and_non_finite() {
        let model = GradientBoosting::new(BoostingConfig::default()).unwrap();
        assert!(model.fit(&[], &[], FitOptions::default()).is_err());
        assert!(model
            .fit(&[[1.0, 1.0, 2023.0]], &[f64::NAN], FitOptions::default())
            .is_err());
    }

    #[test]
    fn test_subsample_is_reproducible() {
        let x = monthly_features(24);
        let y: Vec<f64> = (0..24).map(|i| 50.0 + i as f64).collect();
        let config = BoostingConfig {
            subsample: 0.5,
            seed: 7,
            n_estimators: 200,
            ..BoostingConfig::default()
        };
        let model = GradientBoosting::new(config).unwrap();
        let a = model.fit(&x, &y, FitOptions::default()).unwrap();
        let b = model.fit(&x, &y, FitOptions::default()).unwrap();
        assert_eq!(a.predict(&x), b.predict(&x));
    }
}
