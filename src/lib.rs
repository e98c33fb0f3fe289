//! Station Summary Library
//!
//! Turns free-form weather-station messages into per-station,
//! per-measurement mean values.
//!
//! This library provides tools for:
//! - Registering ordered regex patterns, one meaningful capture per pattern
//! - Extracting the first matching measurement from each message
//! - Annotating whole datasets in parallel while keeping row order
//! - Aggregating annotated rows into a sparse station × kind mean table
//! - Loading CSV datasets from disk or HTTP, or rows from a SQLite query
//! - Writing CSV/JSON results

pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod processor;
pub mod validation;

pub use config::{PatternSpec, ProcessorConfig};
pub use error::{ProcessorError, Result};
pub use loader::{CsvLoader, DatasetLoader, InMemoryLoader, SqlLoader};
pub use models::{AnnotatedRecord, MatchStats, Measurement, RawRecord, RecordOutcome};
pub use processor::aggregate::{SummaryTable, aggregate, aggregate_with_workers};
pub use processor::batch::BatchProcessor;
pub use processor::observer::{NoopObserver, ProcessingObserver, StatsCollector, TracingObserver};
pub use processor::registry::PatternRegistry;
pub use processor::{PipelineOutput, SummaryPipeline};
