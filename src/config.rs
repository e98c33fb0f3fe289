//! Configuration for a station summary run.
//!
//! Holds the source descriptor, the ordered measurement patterns and the
//! column names to read. The value is immutable once handed to the
//! pipeline; patterns are compiled into a [`PatternRegistry`] up front so
//! configuration mistakes surface before any data is loaded.

use crate::error::Result;
use crate::processor::registry::PatternRegistry;
use serde::{Deserialize, Serialize};

/// Default station identifier column name
pub const DEFAULT_STATION_COLUMN: &str = "Weather_station_ID";

/// Default free-form message column name
pub const DEFAULT_MESSAGE_COLUMN: &str = "Message";

/// A named measurement pattern, compiled later into the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub kind: String,
    pub pattern: String,
}

impl PatternSpec {
    pub fn new(kind: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            pattern: pattern.into(),
        }
    }
}

/// Configuration for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// CSV file path or http(s) URL
    pub source: String,

    /// Patterns in precedence order; the first matching pattern wins
    pub patterns: Vec<PatternSpec>,

    /// Column holding the station identifier
    pub station_column: String,

    /// Column holding the raw message
    pub message_column: String,

    /// Worker threads for annotation and aggregation (1 = sequential)
    pub workers: usize,
}

impl ProcessorConfig {
    /// Create a configuration with no patterns for the given source
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            patterns: Vec::new(),
            station_column: DEFAULT_STATION_COLUMN.to_string(),
            message_column: DEFAULT_MESSAGE_COLUMN.to_string(),
            workers: num_cpus::get(),
        }
    }

    /// Configuration with the standard weather-station patterns
    pub fn weather_station_defaults(source: impl Into<String>) -> Self {
        Self::new(source).with_patterns(default_weather_patterns())
    }

    /// Append a pattern after those already registered
    pub fn with_pattern(mut self, kind: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.patterns.push(PatternSpec::new(kind, pattern));
        self
    }

    /// Replace all patterns
    pub fn with_patterns(mut self, patterns: Vec<PatternSpec>) -> Self {
        self.patterns = patterns;
        self
    }

    /// Set the worker thread count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the station and message column names
    pub fn with_columns(
        mut self,
        station_column: impl Into<String>,
        message_column: impl Into<String>,
    ) -> Self {
        self.station_column = station_column.into();
        self.message_column = message_column.into();
        self
    }

    /// Compile the configured patterns
    pub fn registry(&self) -> Result<PatternRegistry> {
        PatternRegistry::new(
            self.patterns
                .iter()
                .map(|spec| (spec.kind.as_str(), spec.pattern.as_str())),
        )
    }
}

/// Rainfall, temperature and pollution patterns, in precedence order
pub fn default_weather_patterns() -> Vec<PatternSpec> {
    vec![
        PatternSpec::new("Rainfall", r"(\d+(\.\d+)?)\s?mm"),
        PatternSpec::new("Temperature", r"(\d+(\.\d+)?)\s?C"),
        PatternSpec::new(
            "Pollution_level",
            r"=\s*(-?\d+(\.\d+)?)|Pollution at \s*(-?\d+(\.\d+)?)",
        ),
    ]
}
