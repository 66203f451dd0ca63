use chrono::NaiveDate;
use segment_forecast::utils::add_months;
use segment_forecast::{FactTable, Metric, Observation, OutlierPipeline, PipelineConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Segment Forecast: Basic Outlier Example");
    println!("=======================================\n");

    // Two years of sales for two products; one of them spikes in the last month
    let table = create_sample_table()?;
    println!("Sample fact table created: {} rows\n", table.len());

    let config = PipelineConfig::default();
    let report = OutlierPipeline::from_config(&config)?.run(&table)?;

    println!(
        "Scored {} segments, skipped {}",
        report.processed,
        report.skipped.len()
    );
    for row in report.table.rows() {
        println!(
            "  {} {} {:<10} value={:>8} prediction={:>8.1} outlier={}",
            row.date,
            row.metric,
            row.product,
            row.value.map_or("-".to_string(), |v| format!("{:.0}", v)),
            row.prediction,
            row.is_outlier.map_or("-".to_string(), |o| o.to_string()),
        );
    }

    if let Some(accuracy) = &report.accuracy {
        println!("\nBack-test accuracy: {}", accuracy);
    }

    Ok(())
}

fn create_sample_table() -> Result<FactTable, Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).ok_or("invalid start date")?;
    let mut rows = Vec::new();
    for i in 0..24u32 {
        let date = add_months(start, i)?;

        // December peak
        let seasonal = if i % 12 == 11 { 180.0 } else { 120.0 };
        rows.push(Observation::new(
            date,
            Metric::Quantity,
            "Retail",
            "CRI",
            "Aspirin",
            Some(seasonal),
        ));

        let spike = if i == 23 { 900.0 } else { 90.0 };
        rows.push(Observation::new(
            date,
            Metric::Quantity,
            "Retail",
            "CRI",
            "Ibuprofen",
            Some(spike),
        ));
    }
    Ok(FactTable::new(rows))
}
