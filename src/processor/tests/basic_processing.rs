//! Basic pipeline scenarios

use super::{records, temp_hum_config};
use crate::config::ProcessorConfig;
use crate::loader::{CsvLoader, InMemoryLoader};
use crate::models::MatchStats;
use crate::processor::observer::{NoopObserver, StatsCollector};
use crate::processor::{MEASUREMENT_COLUMN, SummaryPipeline, VALUE_COLUMN, annotated_frame};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_two_stations_one_kind() {
    let pipeline = SummaryPipeline::new(temp_hum_config()).unwrap();
    let input = records(&[
        ("S1", "Temperature: 20.0"),
        ("S1", "Temperature: 30.0"),
        ("S2", "Temperature: 10.0"),
    ]);

    let output = pipeline.summarize("memory", input, &NoopObserver).unwrap();

    assert_eq!(output.summary.get("S1", "temp"), Some(25.0));
    assert_eq!(output.summary.get("S2", "temp"), Some(10.0));
    assert_eq!(output.summary.get("S1", "hum"), None);
    assert_eq!(output.summary.shape(), (2, 1));
    assert_eq!(output.summary.kinds(), vec!["temp"]);
}

#[test]
fn test_unmatched_rows_are_kept_but_not_aggregated() {
    let pipeline = SummaryPipeline::new(temp_hum_config()).unwrap();
    let input = records(&[
        ("S1", "Temperature: 23.5C"),
        ("S1", "no data"),
        ("S2", "Humidity: 40"),
        ("S2", "sensor offline"),
    ]);

    let output = pipeline.summarize("memory", input, &NoopObserver).unwrap();

    assert_eq!(output.annotated.len(), 4);
    assert_eq!(output.annotated[1].kind(), None);
    assert_eq!(
        output.stats,
        MatchStats {
            total: 4,
            matched: 2,
            unmatched: 2,
            parse_errors: 0,
        }
    );
    assert_eq!(output.summary.cell_count(), 2);
}

#[test]
fn test_all_unmatched_gives_empty_summary() {
    let pipeline = SummaryPipeline::new(temp_hum_config()).unwrap();
    let input = records(&[("S1", "no data"), ("S2", "still nothing")]);

    let output = pipeline.summarize("memory", input, &NoopObserver).unwrap();

    assert!(output.summary.is_empty());
    assert_eq!(output.stats.unmatched, 2);
}

#[test]
fn test_run_from_csv_file() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("weather_station_data.csv");
    fs::write(
        &csv_path,
        "Weather_station_ID,Message\n\
         0,Recorded 12.5 mm of rain\n\
         0,Recorded 7.5 mm of rain\n\
         1,Current temperature: 22C\n\
         1,Air Quality Index = 1.5\n\
         1,Pollution at 2.5 ppm\n\
         2,Station check complete\n",
    )
    .unwrap();

    let config = ProcessorConfig::weather_station_defaults(csv_path.to_string_lossy());
    let pipeline = SummaryPipeline::new(config).unwrap();
    let loader = CsvLoader::from_config(pipeline.config());

    let output = pipeline.run(&loader, &NoopObserver).unwrap();

    assert_eq!(output.summary.get("0", "Rainfall"), Some(10.0));
    assert_eq!(output.summary.get("1", "Temperature"), Some(22.0));
    assert_eq!(output.summary.get("1", "Pollution_level"), Some(2.0));
    assert_eq!(output.summary.get("2", "Rainfall"), None);
    assert_eq!(output.summary.stations(), vec!["0", "1"]);
    assert_eq!(output.stats.total, 6);
    assert_eq!(output.stats.matched, 5);
}

#[test]
fn test_custom_column_names() {
    let config = temp_hum_config().with_columns("station", "text");
    let pipeline = SummaryPipeline::new(config).unwrap();
    let input = records(&[("A", "Humidity: 80"), ("A", "Humidity: 60")]);
    let loader = InMemoryLoader::from_records("memory", "station", "text", &input).unwrap();

    let output = pipeline.run(&loader, &NoopObserver).unwrap();
    assert_eq!(output.summary.get("A", "hum"), Some(70.0));
}

#[test]
fn test_annotated_frame_columns_align_with_input() {
    let pipeline = SummaryPipeline::new(temp_hum_config()).unwrap();
    let input = records(&[("S1", "Temperature: 5"), ("S2", "nothing here")]);
    let loader =
        InMemoryLoader::from_records("memory", "Weather_station_ID", "Message", &input).unwrap();

    let df = crate::loader::DatasetLoader::load(&loader).unwrap();
    let output = pipeline.run_frame("memory", &df, &NoopObserver).unwrap();
    let annotated = annotated_frame(&df, &output.annotated).unwrap();

    assert_eq!(annotated.shape(), (2, 4));
    let kinds = annotated
        .column(MEASUREMENT_COLUMN)
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .clone();
    assert_eq!(kinds.get(0), Some("temp"));
    assert_eq!(kinds.get(1), None);

    let values = annotated
        .column(VALUE_COLUMN)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .clone();
    assert_eq!(values.get(0), Some(5.0));
    assert_eq!(values.get(1), None);
}

#[test]
fn test_parallel_run_matches_sequential() {
    let input: Vec<_> = (0..2_000)
        .map(|i| {
            let station = format!("S{}", i % 13);
            let message = if i % 5 == 0 {
                format!("Humidity: {}", i % 100)
            } else {
                format!("Temperature: {}.25", i % 40)
            };
            crate::models::RawRecord::new(station, message)
        })
        .collect();

    let sequential = SummaryPipeline::new(temp_hum_config()).unwrap();
    let parallel = SummaryPipeline::new(temp_hum_config().with_workers(4)).unwrap();

    let a = sequential
        .summarize("memory", input.clone(), &NoopObserver)
        .unwrap();
    let b = parallel.summarize("memory", input, &StatsCollector::new()).unwrap();

    assert_eq!(a.annotated, b.annotated);
    assert_eq!(a.summary, b.summary);
}
