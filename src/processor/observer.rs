//! Observability hooks for the batch processor.
//!
//! The processor never configures logging itself; callers pass a sink that
//! decides what to do with per-record events and the final match counts.

use crate::error::ProcessorError;
use crate::models::{MatchStats, RawRecord, RecordOutcome};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// Receives events while a batch is annotated.
///
/// Events may arrive from several worker threads at once.
pub trait ProcessingObserver: Send + Sync {
    /// Called once before annotation with the number of records
    fn on_start(&self, _total: usize) {}

    /// Called for every record after extraction
    fn on_record(&self, _index: usize, _outcome: RecordOutcome) {}

    /// Called when a pattern matched but its capture was not numeric
    fn on_parse_error(&self, _index: usize, _record: &RawRecord, _error: &ProcessorError) {}

    /// Called once with the final counts
    fn on_complete(&self, _stats: &MatchStats) {}
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProcessingObserver for NoopObserver {}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProcessingObserver for TracingObserver {
    fn on_parse_error(&self, index: usize, record: &RawRecord, error: &ProcessorError) {
        warn!(
            "Row {} (station {}) treated as unmatched: {} - message: {:?}",
            index, record.station_id, error, record.message
        );
    }

    fn on_complete(&self, stats: &MatchStats) {
        info!(
            "Messages processed: {} total, {} matched, {} unmatched, {} parse errors",
            stats.total, stats.matched, stats.unmatched, stats.parse_errors
        );
    }
}

/// A record that failed numeric parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub index: usize,
    pub station_id: String,
    pub message: String,
    pub reason: String,
}

/// Keeps counts and failing rows in memory for later reporting
#[derive(Debug, Default)]
pub struct StatsCollector {
    failures: Mutex<Vec<ParseFailure>>,
    stats: Mutex<Option<MatchStats>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Final counts, once the batch has completed
    pub fn stats(&self) -> Option<MatchStats> {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parse failures ordered by row index
    pub fn failures(&self) -> Vec<ParseFailure> {
        let mut failures = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        failures.sort_by_key(|failure| failure.index);
        failures
    }
}

impl ProcessingObserver for StatsCollector {
    fn on_parse_error(&self, index: usize, record: &RawRecord, error: &ProcessorError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ParseFailure {
                index,
                station_id: record.station_id.clone(),
                message: record.message.clone(),
                reason: error.to_string(),
            });
    }

    fn on_complete(&self, stats: &MatchStats) {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = Some(*stats);
    }
}
