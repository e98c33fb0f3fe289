//! Command-line interface components.

use crate::config::{PatternSpec, ProcessorConfig, default_weather_patterns};
use crate::error::ProcessorError;
use crate::loader::{CsvLoader, DatasetLoader, SqlLoader};
use crate::models::{MatchStats, RawRecord, RecordOutcome};
use crate::processor::observer::{ProcessingObserver, TracingObserver};
use crate::processor::writer::{
    OutputFormat, SummaryReport, write_frame_csv, write_report_json, write_summary_csv,
};
use crate::processor::{PipelineOutput, SummaryPipeline, annotated_frame};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "station-summary")]
#[command(about = "Extract measurements from weather-station messages and average them per station")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// CSV file path or http(s) URL of the raw station messages, or a
    /// SQLite database URL when --query is given
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// SQL query whose result rows are the raw station messages
    #[arg(short, long, value_name = "SQL")]
    pub query: Option<String>,

    /// Measurement pattern as KIND=REGEX; repeat in precedence order
    #[arg(short, long = "pattern", value_name = "KIND=REGEX", value_parser = parse_pattern)]
    pub patterns: Vec<PatternSpec>,

    /// Column holding the station identifier
    #[arg(long, default_value = crate::config::DEFAULT_STATION_COLUMN)]
    pub station_column: String,

    /// Column holding the free-form message
    #[arg(long, default_value = crate::config::DEFAULT_MESSAGE_COLUMN)]
    pub message_column: String,

    /// Worker threads for annotation and aggregation (defaults to the number of CPUs)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Where to write the summary table
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Summary output format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: FormatArg,

    /// Also write the annotated rows (original columns plus Measurement/Value) as CSV
    #[arg(long, value_name = "PATH")]
    pub annotated: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

impl Args {
    /// SQL loader when a query is given, CSV loader otherwise
    pub fn loader(&self, config: &ProcessorConfig) -> Box<dyn DatasetLoader> {
        match &self.query {
            Some(query) => Box::new(SqlLoader::new(self.source.clone(), query.clone())),
            None => Box::new(CsvLoader::from_config(config)),
        }
    }

    /// Build the run configuration; falls back to the weather-station patterns
    pub fn to_config(&self) -> ProcessorConfig {
        let patterns = if self.patterns.is_empty() {
            default_weather_patterns()
        } else {
            self.patterns.clone()
        };

        let config = ProcessorConfig::new(self.source.clone())
            .with_patterns(patterns)
            .with_columns(self.station_column.clone(), self.message_column.clone());

        match self.workers {
            Some(workers) => config.with_workers(workers),
            None => config,
        }
    }

    pub fn get_log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

/// Parse `KIND=REGEX`, splitting at the first `=` so the regex may contain one
pub fn parse_pattern(value: &str) -> std::result::Result<PatternSpec, String> {
    let (kind, pattern) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KIND=REGEX, got '{}'", value))?;

    if kind.trim().is_empty() {
        return Err(format!("missing measurement kind in '{}'", value));
    }
    if pattern.is_empty() {
        return Err(format!("missing regex for '{}'", kind));
    }

    Ok(PatternSpec::new(kind.trim(), pattern))
}

/// Set up tracing to stderr
pub fn init_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("station_summary={}", args.get_log_level())));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init();
}

/// Progress bar driven by batch events; log output goes through tracing
pub struct ProgressObserver {
    bar: ProgressBar,
    log: TracingObserver,
}

impl ProgressObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message("Extracting measurements");
        Self {
            bar,
            log: TracingObserver,
        }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingObserver for ProgressObserver {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_record(&self, _index: usize, _outcome: RecordOutcome) {
        self.bar.inc(1);
    }

    fn on_parse_error(&self, index: usize, record: &RawRecord, error: &ProcessorError) {
        self.bar.suspend(|| self.log.on_parse_error(index, record, error));
    }

    fn on_complete(&self, stats: &MatchStats) {
        self.bar.finish_and_clear();
        self.log.on_complete(stats);
    }
}

/// Run the full pipeline for the parsed arguments and write the outputs
pub fn run(args: &Args) -> Result<PipelineOutput> {
    let config = args.to_config();
    let pipeline = SummaryPipeline::new(config).context("Invalid pattern configuration")?;

    println!(
        "{}",
        "Starting station summary processing".bright_green().bold()
    );
    println!("  {} {}", "Source:".bright_cyan(), args.source);

    let loader = args.loader(pipeline.config());
    let df = loader
        .load()
        .with_context(|| format!("Failed to load dataset from {}", args.source))?;

    let observer = ProgressObserver::new();
    let output = pipeline.run_frame(&loader.source_name(), &df, &observer)?;

    if let Some(path) = &args.annotated {
        let mut annotated = annotated_frame(&df, &output.annotated)?;
        write_frame_csv(&mut annotated, path)
            .with_context(|| format!("Failed to write annotated rows to {}", path.display()))?;
    }

    if let Some(path) = &args.output {
        match OutputFormat::from(args.format) {
            OutputFormat::Csv => write_summary_csv(&output.summary, path),
            OutputFormat::Json => {
                let report = SummaryReport::new(args.source.clone(), output.stats, &output.summary);
                write_report_json(&report, path)
            }
        }
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    } else {
        let table = output.summary.to_dataframe()?;
        println!("\n{}", table);
    }

    print_summary(args, &output);
    Ok(output)
}

fn print_summary(args: &Args, output: &PipelineOutput) {
    let stats = &output.stats;
    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        output.processing_time_ms.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Messages:".bright_cyan(),
        stats.total.to_string().bright_white().bold()
    );
    println!(
        "  {} {} ({:.1}%)",
        "Matched:".bright_cyan(),
        stats.matched.to_string().bright_white(),
        stats.match_rate() * 100.0
    );
    println!(
        "  {} {}",
        "Unmatched:".bright_cyan(),
        stats.unmatched.to_string().bright_white()
    );
    if stats.parse_errors > 0 {
        println!(
            "  {} {}",
            "Parse errors:".bright_red(),
            stats.parse_errors.to_string().bright_red().bold()
        );
    }
    let (stations, kinds) = output.summary.shape();
    println!(
        "  {} {} stations x {} kinds",
        "Summary:".bright_cyan(),
        stations.to_string().bright_white().bold(),
        kinds.to_string().bright_white().bold()
    );
    if let Some(path) = &args.output {
        println!("  {} {}", "Output:".bright_cyan(), path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern_splits_on_first_equals() {
        let spec = parse_pattern(r"Pollution_level==\s*(-?\d+)").unwrap();
        assert_eq!(spec.kind, "Pollution_level");
        assert_eq!(spec.pattern, r"=\s*(-?\d+)");

        assert!(parse_pattern("no-separator").is_err());
        assert!(parse_pattern(r"=(\d+)").is_err());
        assert!(parse_pattern("temp=").is_err());
    }

    #[test]
    fn test_args_default_to_weather_patterns() {
        let args = Args::parse_from(["station-summary", "weather.csv"]);
        let config = args.to_config();

        assert_eq!(config.source, "weather.csv");
        assert_eq!(config.patterns, default_weather_patterns());
        assert_eq!(config.station_column, "Weather_station_ID");
        assert_eq!(args.format, FormatArg::Csv);
        assert_eq!(args.get_log_level(), "info");
    }

    #[test]
    fn test_args_keep_pattern_order() {
        let args = Args::parse_from([
            "station-summary",
            "weather.csv",
            "--pattern",
            r"hum=Humidity:\s*(\d+)",
            "-p",
            r"temp=Temperature:\s*(\d+)",
            "--workers",
            "2",
            "--format",
            "json",
            "-v",
        ]);
        let config = args.to_config();

        let kinds: Vec<_> = config.patterns.iter().map(|p| p.kind.as_str()).collect();
        assert_eq!(kinds, vec!["hum", "temp"]);
        assert_eq!(config.workers, 2);
        assert_eq!(args.format, FormatArg::Json);
        assert_eq!(args.get_log_level(), "debug");
    }

    #[test]
    fn test_query_selects_sql_source() {
        let args = Args::parse_from([
            "station-summary",
            "sqlite://weather.db",
            "--query",
            "SELECT * FROM readings",
        ]);
        assert_eq!(args.query.as_deref(), Some("SELECT * FROM readings"));
        assert_eq!(args.loader(&args.to_config()).source_name(), "sqlite://weather.db");

        let csv = Args::parse_from(["station-summary", "weather.csv"]);
        assert!(csv.query.is_none());
        assert_eq!(csv.loader(&csv.to_config()).source_name(), "weather.csv");
    }
}
