//! Station summary pipeline.
//!
//! Composes the stages Load → Annotate → Aggregate as one straight-line
//! run. The pipeline holds only immutable configuration and a compiled
//! pattern registry; each call works on a freshly supplied dataset and
//! builds a fresh summary, so repeated runs over the same input give
//! identical results.

pub mod aggregate;
pub mod batch;
pub mod extractor;
pub mod observer;
pub mod registry;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::aggregate::{SummaryTable, aggregate_with_workers};
use self::batch::BatchProcessor;
use self::observer::ProcessingObserver;

use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::loader::{DatasetLoader, records_from_frame};
use crate::models::{AnnotatedRecord, MatchStats, RawRecord};

use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Name of the extracted kind column in the annotated frame
pub const MEASUREMENT_COLUMN: &str = "Measurement";

/// Name of the extracted value column in the annotated frame
pub const VALUE_COLUMN: &str = "Value";

/// Everything produced by one run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub annotated: Vec<AnnotatedRecord>,
    pub summary: SummaryTable,
    pub stats: MatchStats,
    pub processing_time_ms: u128,
}

/// Immutable pipeline built from a validated configuration
#[derive(Debug, Clone)]
pub struct SummaryPipeline {
    config: ProcessorConfig,
    processor: BatchProcessor,
}

impl SummaryPipeline {
    /// Compile the configured patterns; fails before any data is touched
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        let registry = config.registry()?;
        let processor = BatchProcessor::new(registry).with_workers(config.workers);
        Ok(Self { config, processor })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn processor(&self) -> &BatchProcessor {
        &self.processor
    }

    /// Load the dataset and summarize it
    pub fn run(
        &self,
        loader: &dyn DatasetLoader,
        observer: &dyn ProcessingObserver,
    ) -> Result<PipelineOutput> {
        let source_name = loader.source_name();
        let df = loader.load()?;
        self.run_frame(&source_name, &df, observer)
    }

    /// Summarize a frame that has already been loaded
    pub fn run_frame(
        &self,
        source_name: &str,
        df: &DataFrame,
        observer: &dyn ProcessingObserver,
    ) -> Result<PipelineOutput> {
        if df.height() == 0 {
            return Err(ProcessorError::empty_dataset(source_name));
        }

        let records = records_from_frame(
            df,
            source_name,
            &self.config.station_column,
            &self.config.message_column,
        )?;
        debug!("Loaded {} records from {}", records.len(), source_name);

        self.summarize(source_name, records, observer)
    }

    /// Annotate and aggregate records that are already in memory
    pub fn summarize(
        &self,
        source_name: &str,
        records: Vec<RawRecord>,
        observer: &dyn ProcessingObserver,
    ) -> Result<PipelineOutput> {
        if records.is_empty() {
            return Err(ProcessorError::empty_dataset(source_name));
        }

        let start_time = Instant::now();
        let annotated = self.processor.annotate(records, observer);
        let summary = aggregate_with_workers(&annotated.records, self.processor.workers());
        let processing_time_ms = start_time.elapsed().as_millis();

        info!(
            "Mean values calculated for {} stations across {} measurement kinds in {}ms",
            summary.stations().len(),
            summary.kinds().len(),
            processing_time_ms
        );

        Ok(PipelineOutput {
            annotated: annotated.records,
            summary,
            stats: annotated.stats,
            processing_time_ms,
        })
    }
}

/// Append `Measurement` and `Value` columns to the frame the records came from
pub fn annotated_frame(df: &DataFrame, records: &[AnnotatedRecord]) -> Result<DataFrame> {
    if df.height() != records.len() {
        return Err(ProcessorError::malformed_source(
            "annotated records",
            format!(
                "frame has {} rows but {} records were annotated",
                df.height(),
                records.len()
            ),
        ));
    }

    let kinds: Vec<Option<&str>> = records.iter().map(AnnotatedRecord::kind).collect();
    let values: Vec<Option<f64>> = records.iter().map(AnnotatedRecord::value).collect();

    let mut annotated = df.clone();
    annotated.with_column(Column::new(MEASUREMENT_COLUMN.into(), kinds))?;
    annotated.with_column(Column::new(VALUE_COLUMN.into(), values))?;
    Ok(annotated)
}
