//! Batch annotation of raw records.
//!
//! Applies the extractor to every record independently. Output order always
//! matches input order, including when annotation is spread over a rayon
//! pool. A record whose capture is not numeric is reported to the observer
//! and emitted as unmatched; it never aborts the batch.

use super::observer::ProcessingObserver;
use super::registry::PatternRegistry;
use crate::models::{AnnotatedRecord, MatchStats, RawRecord, RecordOutcome};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Annotated records plus the counts gathered while producing them
#[derive(Debug, Clone)]
pub struct Annotated {
    pub records: Vec<AnnotatedRecord>,
    pub stats: MatchStats,
}

/// Owns the pattern registry for the duration of a run
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    registry: PatternRegistry,
    workers: usize,
}

impl BatchProcessor {
    /// Create a processor that annotates on the calling thread
    pub fn new(registry: PatternRegistry) -> Self {
        Self {
            registry,
            workers: 1,
        }
    }

    /// Spread annotation over `workers` threads
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Annotate every record, in input order
    pub fn process(
        &self,
        records: Vec<RawRecord>,
        observer: &dyn ProcessingObserver,
    ) -> Vec<AnnotatedRecord> {
        self.annotate(records, observer).records
    }

    /// Annotate every record and return the match counts alongside
    pub fn annotate(&self, records: Vec<RawRecord>, observer: &dyn ProcessingObserver) -> Annotated {
        observer.on_start(records.len());

        let outcomes = if self.workers > 1 && records.len() > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
            {
                Ok(pool) => {
                    debug!(
                        "Annotating {} records on {} workers",
                        records.len(),
                        self.workers
                    );
                    pool.install(|| {
                        records
                            .into_par_iter()
                            .enumerate()
                            .map(|(index, record)| self.annotate_one(index, record, observer))
                            .collect::<Vec<_>>()
                    })
                }
                Err(e) => {
                    warn!("Could not build worker pool, annotating sequentially: {}", e);
                    self.annotate_sequential(records, observer)
                }
            }
        } else {
            self.annotate_sequential(records, observer)
        };

        let mut stats = MatchStats::default();
        let records = outcomes
            .into_iter()
            .map(|(record, outcome)| {
                stats.record(outcome);
                record
            })
            .collect();

        observer.on_complete(&stats);
        Annotated { records, stats }
    }

    fn annotate_sequential(
        &self,
        records: Vec<RawRecord>,
        observer: &dyn ProcessingObserver,
    ) -> Vec<(AnnotatedRecord, RecordOutcome)> {
        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| self.annotate_one(index, record, observer))
            .collect()
    }

    fn annotate_one(
        &self,
        index: usize,
        record: RawRecord,
        observer: &dyn ProcessingObserver,
    ) -> (AnnotatedRecord, RecordOutcome) {
        let (annotated, outcome) = match self.registry.extract(&record.message) {
            Ok(Some(measurement)) => (
                AnnotatedRecord::matched(record, measurement),
                RecordOutcome::Matched,
            ),
            Ok(None) => (AnnotatedRecord::unmatched(record), RecordOutcome::Unmatched),
            Err(e) => {
                observer.on_parse_error(index, &record, &e);
                (AnnotatedRecord::unmatched(record), RecordOutcome::ParseError)
            }
        };
        observer.on_record(index, outcome);
        (annotated, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::observer::{NoopObserver, StatsCollector};

    fn processor() -> BatchProcessor {
        let registry = PatternRegistry::new([
            ("temp", r"Temperature:\s*(-?\d+\.?\d*)"),
            ("hum", r"Humidity:\s*(\d+\.?\d*)"),
            ("reading", r"Reading:\s*(\S+)"),
        ])
        .unwrap();
        BatchProcessor::new(registry)
    }

    fn sample_records() -> Vec<RawRecord> {
        vec![
            RawRecord::new("S1", "Temperature: 20.0"),
            RawRecord::new("S1", "no data"),
            RawRecord::new("S2", "Humidity: 55"),
            RawRecord::new("S2", "Reading: broken"),
            RawRecord::new("S3", ""),
        ]
    }

    #[test]
    fn test_every_record_is_emitted_in_order() {
        let records = sample_records();
        let annotated = processor().process(records.clone(), &NoopObserver);

        assert_eq!(annotated.len(), records.len());
        for (input, output) in records.iter().zip(&annotated) {
            assert_eq!(&output.record, input);
        }
        assert_eq!(annotated[0].kind(), Some("temp"));
        assert_eq!(annotated[1].kind(), None);
        assert_eq!(annotated[2].value(), Some(55.0));
    }

    #[test]
    fn test_parse_errors_are_contained_and_reported() {
        let collector = StatsCollector::new();
        let result = processor().annotate(sample_records(), &collector);

        assert!(!result.records[3].is_matched());
        assert_eq!(
            result.stats,
            MatchStats {
                total: 5,
                matched: 2,
                unmatched: 2,
                parse_errors: 1,
            }
        );

        let failures = collector.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 3);
        assert_eq!(failures[0].station_id, "S2");
        assert_eq!(collector.stats(), Some(result.stats));
    }

    #[test]
    fn test_parallel_annotation_matches_sequential() {
        let records: Vec<RawRecord> = (0..500)
            .map(|i| match i % 3 {
                0 => RawRecord::new(format!("S{}", i % 7), format!("Temperature: {}.5", i)),
                1 => RawRecord::new(format!("S{}", i % 7), format!("Humidity: {}", i)),
                _ => RawRecord::new(format!("S{}", i % 7), "static"),
            })
            .collect();

        let sequential = processor().annotate(records.clone(), &NoopObserver);
        let parallel = processor()
            .with_workers(4)
            .annotate(records, &NoopObserver);

        assert_eq!(sequential.records, parallel.records);
        assert_eq!(sequential.stats, parallel.stats);
    }

    #[test]
    fn test_empty_batch() {
        let result = processor().annotate(Vec::new(), &NoopObserver);
        assert!(result.records.is_empty());
        assert_eq!(result.stats, MatchStats::default());
    }

    #[test]
    fn test_with_workers_clamps_to_one() {
        assert_eq!(processor().with_workers(0).workers(), 1);
    }
}
