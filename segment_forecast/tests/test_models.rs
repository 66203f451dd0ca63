use approx::assert_relative_eq;
use chrono::NaiveDate;
use segment_forecast::features::build_features;
use segment_forecast::models::gradient_boosting::{BoostingConfig, GradientBoosting};
use segment_forecast::models::{FitOptions, Regressor, TrainedRegressor};
use segment_forecast::utils::add_months;

fn months(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    (0..n).map(|i| add_months(start, i as u32).unwrap()).collect()
}

#[test]
fn test_flat_history_predicts_level() {
    let x = build_features(&months(24));
    let y = vec![100.0; 24];
    let model = GradientBoosting::new(BoostingConfig::default()).unwrap();

    let trained = model
        .fit(
            &x[..23],
            &y[..23],
            FitOptions::default().with_validation(&x[23..], &y[23..]),
        )
        .unwrap();
    let prediction = trained.predict_one(&x[23]).ceil();

    assert_eq!(prediction, 100.0);
}

#[test]
fn test_forecast_beyond_training_years() {
    let dates = months(36);
    let x = build_features(&dates);
    let y: Vec<f64> = dates
        .iter()
        .enumerate()
        .map(|(i, _)| if i % 12 < 6 { 200.0 } else { 400.0 })
        .collect();
    let config = BoostingConfig {
        learning_rate: 0.05,
        ..BoostingConfig::default()
    };
    let trained = GradientBoosting::new(config)
        .unwrap()
        .fit(&x, &y, FitOptions::default())
        .unwrap();

    let future = build_features(&[
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
    ]);
    let predictions = trained.predict(&future);
    assert_relative_eq!(predictions[0], 200.0, max_relative = 0.05);
    assert_relative_eq!(predictions[1], 400.0, max_relative = 0.05);
}

#[test]
fn test_model_parameter_validation() {
    let result = GradientBoosting::new(BoostingConfig {
        n_estimators: 0,
        ..BoostingConfig::default()
    });
    assert!(result.is_err());

    let result = GradientBoosting::new(BoostingConfig {
        subsample: 1.5,
        ..BoostingConfig::default()
    });
    assert!(result.is_err());

    let result = GradientBoosting::new(BoostingConfig {
        early_stopping_rounds: Some(0),
        ..BoostingConfig::default()
    });
    assert!(result.is_err());
}

#[test]
fn test_mismatched_lengths() {
    let model = GradientBoosting::new(BoostingConfig::default()).unwrap();
    let x = build_features(&months(3));
    assert!(model.fit(&x, &[1.0, 2.0], FitOptions::default()).is_err());
    assert!(model
        .fit(&x, &[1.0, 2.0, 3.0], FitOptions::default().with_validation(&x[..0], &[]))
        .is_ok());
}
