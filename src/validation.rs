//! Dataset validation checks.
//!
//! Reusable assertions about a loaded table: exact shape, required
//! columns, sign of numeric columns and membership of categorical values.
//! Each failure is reported as a malformed source.

use crate::error::{ProcessorError, Result};
use polars::prelude::*;

/// Require an exact `(rows, columns)` shape
pub fn expect_shape(df: &DataFrame, source_name: &str, expected: (usize, usize)) -> Result<()> {
    let actual = df.shape();
    if actual != expected {
        return Err(ProcessorError::malformed_source(
            source_name,
            format!(
                "expected shape ({}, {}), found ({}, {})",
                expected.0, expected.1, actual.0, actual.1
            ),
        ));
    }
    Ok(())
}

/// Require every named column to be present
pub fn expect_columns(df: &DataFrame, source_name: &str, required: &[&str]) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !present.iter().any(|p| p.as_str() == *name))
        .collect();

    if !missing.is_empty() {
        return Err(ProcessorError::malformed_source(
            source_name,
            format!("missing columns: {}", missing.join(", ")),
        ));
    }
    Ok(())
}

/// Require a numeric column to have no negative values; nulls are ignored
pub fn expect_non_negative(df: &DataFrame, source_name: &str, column: &str) -> Result<()> {
    let values = numeric_column(df, source_name, column)?;
    let negatives = values
        .f64()?
        .into_iter()
        .flatten()
        .filter(|value| *value < 0.0)
        .count();

    if negatives > 0 {
        return Err(ProcessorError::malformed_source(
            source_name,
            format!("column '{}' has {} negative values", column, negatives),
        ));
    }
    Ok(())
}

/// Require every non-null value of a string column, trimmed, to be allowed
pub fn expect_allowed_values(
    df: &DataFrame,
    source_name: &str,
    column: &str,
    allowed: &[&str],
) -> Result<()> {
    let series = df
        .column(column)
        .map_err(|_| missing_column(source_name, column))?
        .as_materialized_series()
        .clone();
    let values = series.str().map_err(|_| {
        ProcessorError::malformed_source(source_name, format!("column '{}' is not text", column))
    })?;

    let mut unexpected: Vec<String> = values
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|value| !allowed.iter().any(|a| a.trim() == *value))
        .map(str::to_string)
        .collect();
    unexpected.sort();
    unexpected.dedup();

    if !unexpected.is_empty() {
        return Err(ProcessorError::malformed_source(
            source_name,
            format!(
                "column '{}' has unexpected values: {}",
                column,
                unexpected.join(", ")
            ),
        ));
    }
    Ok(())
}

fn numeric_column(df: &DataFrame, source_name: &str, column: &str) -> Result<Series> {
    let series = df
        .column(column)
        .map_err(|_| missing_column(source_name, column))?
        .as_materialized_series();

    let dtype = series.dtype();
    if !(dtype.is_integer() || dtype.is_float()) {
        return Err(ProcessorError::malformed_source(
            source_name,
            format!("column '{}' is not numeric ({})", column, dtype),
        ));
    }
    Ok(series.cast(&DataType::Float64)?)
}

fn missing_column(source_name: &str, column: &str) -> ProcessorError {
    ProcessorError::malformed_source(source_name, format!("missing required column '{}'", column))
}
