use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use segment_forecast::data::{FactTable, Metric, Observation};
use segment_forecast::segment::{SegmentKey, Segmenter, Series, SeriesPoint};
use segment_forecast::utils::add_months;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn series_from(values: &[Option<f64>]) -> Series {
    let points = values
        .iter()
        .enumerate()
        .map(|(i, v)| SeriesPoint {
            date: add_months(start(), i as u32).unwrap(),
            value: *v,
        })
        .collect();
    Series::new(SegmentKey::new(Metric::Value, "Retail", "HND", "P"), points).unwrap()
}

#[test]
fn test_segments_are_independent_of_row_order() {
    let rows = vec![
        Observation::new(start(), Metric::Quantity, "Retail", "MX", "B", Some(1.0)),
        Observation::new(start(), Metric::Quantity, "Retail", "MX", "A", Some(2.0)),
        Observation::new(
            add_months(start(), 1).unwrap(),
            Metric::Quantity,
            "Retail",
            "MX",
            "A",
            Some(3.0),
        ),
    ];
    let mut reversed = rows.clone();
    reversed.reverse();

    let a = Segmenter::split(&FactTable::new(rows)).unwrap();
    let b = Segmenter::split(&FactTable::new(reversed)).unwrap();
    assert_eq!(a, b);

    let keys: Vec<String> = a.iter().map(|s| s.key().to_string()).collect();
    assert_eq!(keys, vec!["QTY/Retail/MX/A", "QTY/Retail/MX/B"]);
}

#[test]
fn test_series_rejects_duplicate_months() {
    let point = SeriesPoint {
        date: start(),
        value: Some(1.0),
    };
    let result = Series::new(
        SegmentKey::new(Metric::Quantity, "Retail", "MX", "A"),
        vec![point, point],
    );
    assert!(result.is_err());
}

#[test]
fn test_align_noop_at_global_max() {
    let series = series_from(&[Some(1.0), Some(2.0)]);
    let last = series.last_date().unwrap();
    assert_eq!(series.clone().align_to(last), series);
}

proptest! {
    #[test]
    fn align_is_idempotent(
        values in prop::collection::vec(prop::option::of(0.0f64..1e6), 1..36),
        lag in 0u32..6,
    ) {
        let series = series_from(&values);
        let global_max = add_months(series.last_date().unwrap(), lag).unwrap();

        let once = series.clone().align_to(global_max);
        let twice = once.clone().align_to(global_max);

        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.last_date(), Some(global_max));
        let expected = values.len() + usize::from(lag > 0);
        prop_assert_eq!(once.len(), expected);
    }

    #[test]
    fn zero_fill_produces_monthly_spacing(
        gaps in prop::collection::vec(1u32..4, 1..12),
    ) {
        let mut date = start();
        let mut points = vec![SeriesPoint { date, value: Some(1.0) }];
        for gap in &gaps {
            date = add_months(date, *gap).unwrap();
            points.push(SeriesPoint { date, value: Some(1.0) });
        }
        let series = Series::new(SegmentKey::new(Metric::Quantity, "Retail", "MX", "A"), points)
            .unwrap()
            .zero_fill_gaps()
            .unwrap();

        let total: u32 = gaps.iter().sum();
        prop_assert_eq!(series.len(), total as usize + 1);
        for pair in series.points().windows(2) {
            prop_assert_eq!(add_months(pair[0].date, 1).unwrap(), pair[1].date);
        }
    }
}
