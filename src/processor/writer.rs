//! Output writers for summary results.
//!
//! CSV output goes through polars' `CsvWriter`; the JSON report is a
//! serde document carrying the means together with the match counts.

use super::aggregate::SummaryTable;
use crate::error::Result;
use crate::models::MatchStats;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Output format for the summary table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Csv,
    Json,
}

/// Serializable result of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub stats: MatchStats,
    /// Means by station, then kind; absent cells are omitted
    pub stations: BTreeMap<String, BTreeMap<String, f64>>,
}

impl SummaryReport {
    pub fn new(source: impl Into<String>, stats: MatchStats, table: &SummaryTable) -> Self {
        Self {
            source: source.into(),
            generated_at: Utc::now(),
            stats,
            stations: table.to_nested(),
        }
    }
}

/// Write a frame as CSV with a header row
pub fn write_frame_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Write the wide summary table as CSV
pub fn write_summary_csv(table: &SummaryTable, path: &Path) -> Result<()> {
    let mut df = table.to_dataframe()?;
    write_frame_csv(&mut df, path)
}

/// Write the summary report as pretty-printed JSON
pub fn write_report_json(report: &SummaryReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    debug!("Wrote JSON report to {}", path.display());
    Ok(())
}
