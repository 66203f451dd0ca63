//! Outlier and forecast bot.
//!
//! Usage: `outliers_n_forecast [config.toml]`
//!
//! Reads `<data_dir>/input/<input_file>`, scores every segment and writes
//! `<data_dir>/output/<output_file>`. `NRC_DATA_DIR` overrides `data_dir`.

use segment_forecast::{DataLoader, OutlierPipeline, PipelineConfig, Result};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<PipelineConfig> {
    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn run() -> Result<()> {
    let config = load_config()?;
    let input = config.io.input_path();
    let output = config.io.output_path();

    let table = DataLoader::from_csv(&input, config.io.delimiter_byte()?)?;
    tracing::info!(path = %input.display(), rows = table.len(), "fact table loaded");

    let report = OutlierPipeline::from_config(&config)?.run(&table)?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    report.table.write_csv(&output)?;

    for skipped in &report.skipped {
        tracing::warn!(segment = %skipped.key, reason = %skipped.reason, "not scored");
    }
    tracing::info!(
        path = %output.display(),
        processed = report.processed,
        skipped = report.skipped.len(),
        "outliers and forecast report written"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "outlier and forecast run failed");
            ExitCode::FAILURE
        }
    }
}
