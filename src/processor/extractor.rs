//! Measurement extraction from a single message.

use super::registry::PatternRegistry;
use crate::error::{ProcessorError, Result};
use crate::models::Measurement;
use tracing::debug;

impl PatternRegistry {
    /// Extract the first measurement found in `message`.
    ///
    /// Patterns are tried in registration order and the first one that
    /// matches anywhere in the message decides the result, even when a
    /// later pattern would also match. Returns `Ok(None)` when nothing
    /// matches, and an `Extraction` error when a pattern matches but its
    /// capture is not a number.
    pub fn extract(&self, message: &str) -> Result<Option<Measurement>> {
        for entry in self.iter() {
            let Some(captures) = entry.regex().captures(message) else {
                continue;
            };

            // First participating group; for alternations this is the
            // group of whichever branch matched.
            let text = captures
                .iter()
                .skip(1)
                .flatten()
                .next()
                .map(|m| m.as_str())
                .unwrap_or_default();

            let value = parse_value(text).map_err(|reason| ProcessorError::Extraction {
                kind: entry.kind().to_string(),
                text: text.to_string(),
                reason,
            })?;

            debug!("Measurement extracted: {} = {}", entry.kind(), value);
            return Ok(Some(Measurement::new(entry.kind(), value)));
        }

        debug!("No measurement match found");
        Ok(None)
    }
}

/// Parse captured text as a float, tolerating surrounding whitespace and a sign
fn parse_value(text: &str) -> std::result::Result<f64, String> {
    text.trim().parse::<f64>().map_err(|e| e.to_string())
}
