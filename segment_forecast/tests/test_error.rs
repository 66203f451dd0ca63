use segment_forecast::error::ForecastError;
use std::io;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let forecast_error = ForecastError::from(io_error);

    match forecast_error {
        ForecastError::IoError(_) => {}
        _ => panic!("Expected IoError variant"),
    }

    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(
        ForecastError::from(json_error),
        ForecastError::JsonError(_)
    ));
}

#[test]
fn test_error_display() {
    let error = ForecastError::InsufficientHistory {
        key: "QTY/Retail/MX/X".to_string(),
        observations: 1,
    };
    let error_string = format!("{}", error);
    assert!(error_string.contains("QTY/Retail/MX/X"));
    assert!(error_string.contains("1 observation"));

    let error = ForecastError::MissingUpstreamColumn("Product".to_string());
    assert_eq!(error.to_string(), "Missing upstream column: Product");

    let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
    let error_string = ForecastError::from(io_error).to_string();
    assert!(error_string.contains("IO error"));
    assert!(error_string.contains("permission denied"));
}

#[test]
fn test_segment_local_classification() {
    let local = [
        ForecastError::InsufficientHistory {
            key: "k".to_string(),
            observations: 0,
        },
        ForecastError::ModelFit {
            key: "k".to_string(),
            reason: "degenerate".to_string(),
        },
        ForecastError::FitTimeout {
            key: "k".to_string(),
            elapsed_ms: 10,
        },
    ];
    assert!(local.iter().all(ForecastError::is_segment_local));

    let fatal = [
        ForecastError::EmptyInput,
        ForecastError::MissingUpstreamColumn("Date".to_string()),
        ForecastError::DataError("bad row".to_string()),
        ForecastError::InvalidParameter("depth".to_string()),
    ];
    assert!(!fatal.iter().any(ForecastError::is_segment_local));
}
