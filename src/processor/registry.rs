//! Ordered registry of measurement patterns.
//!
//! Entries are kept in registration order because extraction is
//! first-match-wins. Every pattern must expose exactly one meaningful
//! capture group per alternative: a capturing group that is not nested
//! inside another capturing group. Nested groups such as the fractional
//! part in `(\d+(\.\d+)?)` are allowed.

use crate::error::{ProcessorError, Result};
use crate::processor::aggregate::STATION_ID_COLUMN;
use regex::Regex;
use regex_syntax::ast::{parse::Parser, Ast};
use std::collections::HashSet;
use tracing::debug;

/// A compiled pattern for one measurement kind
#[derive(Debug, Clone)]
pub struct PatternEntry {
    kind: String,
    regex: Regex,
}

impl PatternEntry {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// Immutable, ordered set of `(kind, pattern)` entries
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    entries: Vec<PatternEntry>,
}

impl PatternRegistry {
    /// Compile and validate patterns, keeping the order they are supplied in
    pub fn new<I, K, P>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, P)>,
        K: AsRef<str>,
        P: AsRef<str>,
    {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for (kind, pattern) in patterns {
            let kind = kind.as_ref().trim();
            let pattern = pattern.as_ref();

            if kind.is_empty() {
                return Err(ProcessorError::configuration(
                    kind,
                    "measurement kind must not be empty",
                ));
            }
            if kind == STATION_ID_COLUMN {
                return Err(ProcessorError::configuration(
                    kind,
                    "measurement kind is reserved for the summary's station column",
                ));
            }
            if !seen.insert(kind.to_string()) {
                return Err(ProcessorError::configuration(
                    kind,
                    "measurement kind registered more than once",
                ));
            }

            let regex = Regex::new(pattern).map_err(|e| {
                ProcessorError::configuration(kind, format!("invalid regex: {}", e))
            })?;
            validate_capture_groups(kind, pattern)?;

            debug!("Registered pattern for {}: {}", kind, pattern);
            entries.push(PatternEntry {
                kind: kind.to_string(),
                regex,
            });
        }

        if entries.is_empty() {
            return Err(ProcessorError::configuration(
                "<none>",
                "at least one pattern must be registered",
            ));
        }

        Ok(Self { entries })
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = &PatternEntry> {
        self.entries.iter()
    }

    /// Kind names in registration order
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.kind.as_str())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check that each top-level alternative holds exactly one meaningful group
fn validate_capture_groups(kind: &str, pattern: &str) -> Result<()> {
    let ast = Parser::new()
        .parse(pattern)
        .map_err(|e| ProcessorError::configuration(kind, format!("invalid regex: {}", e)))?;

    for (index, branch) in top_level_branches(&ast).into_iter().enumerate() {
        match meaningful_groups(branch) {
            1 => {}
            0 => {
                return Err(ProcessorError::configuration(
                    kind,
                    format!("alternative {} has no capture group", index + 1),
                ));
            }
            n => {
                return Err(ProcessorError::configuration(
                    kind,
                    format!(
                        "alternative {} has {} capture groups, expected exactly one",
                        index + 1,
                        n
                    ),
                ));
            }
        }
    }

    Ok(())
}

/// Split an alternation into its branches, looking through non-capturing groups
fn top_level_branches(ast: &Ast) -> Vec<&Ast> {
    match ast {
        Ast::Alternation(alternation) => alternation
            .asts
            .iter()
            .flat_map(|branch| top_level_branches(branch))
            .collect(),
        Ast::Group(group) if !group.is_capturing() => top_level_branches(&group.ast),
        other => vec![other],
    }
}

/// Count capturing groups that are not nested inside another capturing group
fn meaningful_groups(ast: &Ast) -> usize {
    match ast {
        Ast::Group(group) if group.is_capturing() => 1,
        Ast::Group(group) => meaningful_groups(&group.ast),
        Ast::Repetition(repetition) => meaningful_groups(&repetition.ast),
        Ast::Concat(concat) => concat.asts.iter().map(meaningful_groups).sum(),
        Ast::Alternation(alternation) => alternation.asts.iter().map(meaningful_groups).sum(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_message(result: Result<PatternRegistry>) -> String {
        match result {
            Err(ProcessorError::Configuration { message, .. }) => message,
            Err(other) => panic!("Expected Configuration error, got {:?}", other),
            Ok(_) => panic!("Expected Configuration error, got a registry"),
        }
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let registry = PatternRegistry::new([
            ("zeta", r"z=(\d+)"),
            ("alpha", r"a=(\d+)"),
            ("mid", r"m=(\d+)"),
        ])
        .unwrap();

        let kinds: Vec<_> = registry.kinds().collect();
        assert_eq!(kinds, vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("alpha"));
        assert!(!registry.contains("beta"));
    }

    #[test]
    fn test_station_column_name_is_not_a_kind() {
        let message = config_message(PatternRegistry::new([("station_id", r"id=(\d+)")]));
        assert!(message.contains("reserved"));
    }

    #[test]
    fn test_pattern_without_capture_group_is_rejected() {
        let message = config_message(PatternRegistry::new([("temp", r"Temperature: \d+")]));
        assert!(message.contains("no capture group"));
    }

    #[test]
    fn test_non_capturing_groups_do_not_count() {
        let message = config_message(PatternRegistry::new([("temp", r"(?:Temp|T): \d+")]));
        assert!(message.contains("no capture group"));

        assert!(PatternRegistry::new([("temp", r"(?:Temp|T):\s*(\d+)")]).is_ok());
    }

    #[test]
    fn test_two_sibling_groups_are_rejected() {
        let message = config_message(PatternRegistry::new([("temp", r"(\d+)-(\d+)")]));
        assert!(message.contains("2 capture groups"));
    }

    #[test]
    fn test_nested_groups_are_allowed() {
        assert!(PatternRegistry::new([("rain", r"(\d+(\.\d+)?)\s?mm")]).is_ok());
        assert!(PatternRegistry::new([("named", r"T=(?P<value>-?\d+(?:\.\d+)?)")]).is_ok());
    }

    #[test]
    fn test_one_group_per_alternative() {
        assert!(
            PatternRegistry::new([(
                "pollution",
                r"=\s*(-?\d+(\.\d+)?)|Pollution at \s*(-?\d+(\.\d+)?)"
            )])
            .is_ok()
        );

        let message = config_message(PatternRegistry::new([("pollution", r"=\s*(\d+)|Pollution")]));
        assert!(message.contains("alternative 2"));
    }

    #[test]
    fn test_invalid_regex_is_a_configuration_error() {
        let message = config_message(PatternRegistry::new([("temp", r"Temperature: (\d+")]));
        assert!(message.contains("invalid regex"));
    }

    #[test]
    fn test_duplicate_and_empty_kinds_are_rejected() {
        let message = config_message(PatternRegistry::new([
            ("temp", r"T=(\d+)"),
            ("temp", r"Temp=(\d+)"),
        ]));
        assert!(message.contains("more than once"));

        let message = config_message(PatternRegistry::new([("  ", r"T=(\d+)")]));
        assert!(message.contains("must not be empty"));
    }

    #[test]
    fn test_empty_registry_is_rejected() {
        let patterns: Vec<(&str, &str)> = Vec::new();
        assert!(PatternRegistry::new(patterns).is_err());
    }
}
