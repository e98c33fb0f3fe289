//! Core data structures for station summary processing.
//!
//! Defines the raw and annotated record types that flow through the
//! pipeline and the match statistics reported while annotating.

use serde::{Deserialize, Serialize};

/// One row of input: a station identifier and its free-form message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub station_id: String,
    pub message: String,
}

impl RawRecord {
    pub fn new(station_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            message: message.into(),
        }
    }
}

/// A typed value extracted from a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub kind: String,
    pub value: f64,
}

impl Measurement {
    pub fn new(kind: impl Into<String>, value: f64) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }
}

/// A raw record paired with its extracted measurement, if any.
///
/// Kind and value are carried together so one can never be present
/// without the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    pub record: RawRecord,
    pub measurement: Option<Measurement>,
}

impl AnnotatedRecord {
    pub fn matched(record: RawRecord, measurement: Measurement) -> Self {
        Self {
            record,
            measurement: Some(measurement),
        }
    }

    pub fn unmatched(record: RawRecord) -> Self {
        Self {
            record,
            measurement: None,
        }
    }

    pub fn station_id(&self) -> &str {
        &self.record.station_id
    }

    pub fn kind(&self) -> Option<&str> {
        self.measurement.as_ref().map(|m| m.kind.as_str())
    }

    pub fn value(&self) -> Option<f64> {
        self.measurement.as_ref().map(|m| m.value)
    }

    pub fn is_matched(&self) -> bool {
        self.measurement.is_some()
    }
}

/// How a single record fared in the batch processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordOutcome {
    Matched,
    Unmatched,
    ParseError,
}

/// Match statistics for one annotation pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub parse_errors: usize,
}

impl MatchStats {
    pub fn record(&mut self, outcome: RecordOutcome) {
        self.total += 1;
        match outcome {
            RecordOutcome::Matched => self.matched += 1,
            RecordOutcome::Unmatched => self.unmatched += 1,
            RecordOutcome::ParseError => self.parse_errors += 1,
        }
    }

    /// Fraction of records that produced a measurement
    pub fn match_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.matched as f64 / self.total as f64
    }
}
