//! Pipeline tests for the processor module
//!
//! Exercises the complete Load → Annotate → Aggregate run using in-memory
//! and temporary CSV datasets.

pub mod basic_processing;

use crate::config::ProcessorConfig;
use crate::models::RawRecord;

/// Temperature/humidity configuration used across the pipeline tests
pub fn temp_hum_config() -> ProcessorConfig {
    ProcessorConfig::new("memory")
        .with_pattern("temp", r"Temperature:\s*(-?\d+\.?\d*)")
        .with_pattern("hum", r"Humidity:\s*(\d+\.?\d*)")
        .with_workers(1)
}

/// Shorthand for building raw records
pub fn records(rows: &[(&str, &str)]) -> Vec<RawRecord> {
    rows.iter()
        .map(|(station, message)| RawRecord::new(*station, *message))
        .collect()
}
