//! Error handling for station summary processing.
//!
//! Separates fatal failures (bad pattern configuration, an unreachable or
//! unusable source, an empty dataset) from the per-record extraction error
//! that the batch processor contains and counts.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Configuration error for pattern '{kind}': {message}")]
    Configuration { kind: String, message: String },

    #[error("Source unavailable: {source_name} - {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("Malformed source: {source_name} - {reason}")]
    MalformedSource { source_name: String, reason: String },

    #[error("Dataset is empty: {source_name} returned zero rows")]
    EmptyDataset { source_name: String },

    #[error("Could not parse '{text}' captured by pattern '{kind}' as a number: {reason}")]
    Extraction {
        kind: String,
        text: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProcessorError {
    /// Create a configuration error for the named pattern
    pub fn configuration(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a source unavailable error
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed source error
    pub fn malformed_source(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSource {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an empty dataset error
    pub fn empty_dataset(source_name: impl Into<String>) -> Self {
        Self::EmptyDataset {
            source_name: source_name.into(),
        }
    }

    /// Whether the error aborts a run rather than being contained per record
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Extraction { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProcessorError>;
