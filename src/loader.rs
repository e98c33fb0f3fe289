//! Dataset loading from CSV and SQL sources.
//!
//! Materializes the raw station table from a local CSV file, an http(s)
//! URL or a SQLite query, then turns the station and message columns into
//! [`RawRecord`]s. Failures are split into "could not obtain the source"
//! and "obtained it but it is not a usable table" so callers can tell them
//! apart.

use crate::config::{DEFAULT_MESSAGE_COLUMN, DEFAULT_STATION_COLUMN, ProcessorConfig};
use crate::error::{ProcessorError, Result};
use crate::models::RawRecord;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Column as _, Row as _};
use std::sync::Arc;
use tracing::{debug, info};

/// Supplies a materialized dataset to the pipeline
pub trait DatasetLoader {
    /// Human-readable description of the source, used in errors
    fn source_name(&self) -> String;

    /// Load the full dataset into memory
    fn load(&self) -> Result<DataFrame>;
}

/// Loads a CSV file from disk or over HTTP.
///
/// The station and message columns are always read as text, whatever the
/// rest of the file looks like, so ids such as `007` keep their spelling.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    source: String,
    text_columns: Vec<String>,
}

impl CsvLoader {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text_columns: vec![
                DEFAULT_STATION_COLUMN.to_string(),
                DEFAULT_MESSAGE_COLUMN.to_string(),
            ],
        }
    }

    /// Loader for the configured source and columns
    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self::new(config.source.clone())
            .with_text_columns(&config.station_column, &config.message_column)
    }

    /// Read these station and message columns as text
    pub fn with_text_columns(mut self, station_column: &str, message_column: &str) -> Self {
        self.text_columns = vec![station_column.to_string(), message_column.to_string()];
        self
    }

    pub fn is_remote(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }

    fn fetch_bytes(&self) -> Result<Vec<u8>> {
        if self.is_remote() {
            // Blocking client: must run outside an async context
            let response = reqwest::blocking::get(&self.source)
                .and_then(|response| response.error_for_status())
                .map_err(|e| ProcessorError::source_unavailable(&self.source, e.to_string()))?;
            let bytes = response
                .bytes()
                .map_err(|e| ProcessorError::source_unavailable(&self.source, e.to_string()))?;
            Ok(bytes.to_vec())
        } else {
            let path = Path::new(&self.source);
            if !path.exists() {
                return Err(ProcessorError::source_unavailable(
                    &self.source,
                    "file not found",
                ));
            }
            std::fs::read(path)
                .map_err(|e| ProcessorError::source_unavailable(&self.source, e.to_string()))
        }
    }
}

impl DatasetLoader for CsvLoader {
    fn source_name(&self) -> String {
        self.source.clone()
    }

    fn load(&self) -> Result<DataFrame> {
        let bytes = self.fetch_bytes()?;
        debug!("Fetched {} bytes from {}", bytes.len(), self.source);
        let df = parse_csv_bytes(&self.source, bytes, &self.text_columns)?;
        info!(
            "CSV read successfully from {}: {} rows, {} columns",
            self.source,
            df.height(),
            df.width()
        );
        Ok(df)
    }
}

/// Serves a frame that is already in memory
#[derive(Debug, Clone)]
pub struct InMemoryLoader {
    name: String,
    frame: DataFrame,
}

impl InMemoryLoader {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }

    /// Build a two-column frame from station/message pairs
    pub fn from_records(
        name: impl Into<String>,
        station_column: &str,
        message_column: &str,
        records: &[RawRecord],
    ) -> Result<Self> {
        let stations: Vec<&str> = records.iter().map(|r| r.station_id.as_str()).collect();
        let messages: Vec<&str> = records.iter().map(|r| r.message.as_str()).collect();
        let frame = DataFrame::new(vec![
            Column::new(station_column.into(), stations),
            Column::new(message_column.into(), messages),
        ])?;
        Ok(Self::new(name, frame))
    }
}

impl DatasetLoader for InMemoryLoader {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    fn load(&self) -> Result<DataFrame> {
        Ok(self.frame.clone())
    }
}

/// Runs a query against a SQLite database and serves the result set.
///
/// Every result column is materialized as text. `load` blocks; call it
/// from a plain thread or tokio's blocking pool, never from an async task.
#[derive(Debug, Clone)]
pub struct SqlLoader {
    database_url: String,
    query: String,
}

impl SqlLoader {
    pub fn new(database_url: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            query: query.into(),
        }
    }

    async fn fetch_frame(&self) -> Result<DataFrame> {
        let pool = SqlitePool::connect(&self.database_url)
            .await
            .map_err(|e| ProcessorError::source_unavailable(&self.database_url, e.to_string()))?;
        debug!("Connected to {}", self.database_url);

        let rows = sqlx::query(&self.query).fetch_all(&pool).await;
        pool.close().await;
        let rows = rows.map_err(|e| {
            ProcessorError::source_unavailable(&self.database_url, format!("query failed: {}", e))
        })?;

        let Some(first) = rows.first() else {
            return Err(ProcessorError::empty_dataset(&self.database_url));
        };

        let columns = first
            .columns()
            .iter()
            .map(|column| {
                let values: Vec<Option<String>> = rows
                    .iter()
                    .map(|row| cell_text(row, column.ordinal()))
                    .collect();
                Column::new(column.name().into(), values)
            })
            .collect::<Vec<_>>();

        Ok(DataFrame::new(columns)?)
    }
}

impl DatasetLoader for SqlLoader {
    fn source_name(&self) -> String {
        self.database_url.clone()
    }

    fn load(&self) -> Result<DataFrame> {
        let df = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle.block_on(self.fetch_frame())?,
            Err(_) => tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
                .block_on(self.fetch_frame())?,
        };
        info!(
            "Query executed successfully against {}: {} rows, {} columns",
            self.database_url,
            df.height(),
            df.width()
        );
        Ok(df)
    }
}

/// Render a SQLite cell as text; blobs and nulls become null
fn cell_text(row: &SqliteRow, index: usize) -> Option<String> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value;
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map(|v| v.to_string());
    }
    None
}

/// Parse CSV bytes with a header row.
///
/// Columns named in `text_columns` are read as strings instead of being
/// type-inferred from the leading rows. Names missing from the header are
/// ignored here and reported later by [`records_from_frame`].
pub fn parse_csv_bytes(
    source_name: &str,
    bytes: Vec<u8>,
    text_columns: &[String],
) -> Result<DataFrame> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ProcessorError::empty_dataset(source_name));
    }

    let header = header_names(source_name, &bytes)?;
    let mut overwrite = Schema::default();
    for name in text_columns {
        if header.contains(name) {
            overwrite.with_column(name.as_str().into(), DataType::String);
        }
    }
    debug!(
        "Reading {} of {} columns as text from {}",
        overwrite.len(),
        header.len(),
        source_name
    );

    CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(Some(Arc::new(overwrite)))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| ProcessorError::malformed_source(source_name, e.to_string()))
}

/// Column names from the header row
fn header_names(source_name: &str, bytes: &[u8]) -> Result<Vec<String>> {
    let header = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_n_rows(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| ProcessorError::malformed_source(source_name, e.to_string()))?;

    Ok(header
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect())
}

/// Convert the station and message columns of a frame into raw records.
///
/// Non-string columns, which only come from frames built in memory, are
/// cast to strings. A null message becomes an empty message, which never
/// matches; a null station becomes the empty station.
pub fn records_from_frame(
    df: &DataFrame,
    source_name: &str,
    station_column: &str,
    message_column: &str,
) -> Result<Vec<RawRecord>> {
    let stations = string_column(df, source_name, station_column)?;
    let messages = string_column(df, source_name, message_column)?;

    let stations = stations.str()?;
    let messages = messages.str()?;

    Ok(stations
        .into_iter()
        .zip(messages)
        .map(|(station, message)| {
            RawRecord::new(station.unwrap_or_default(), message.unwrap_or_default())
        })
        .collect())
}

fn string_column(df: &DataFrame, source_name: &str, name: &str) -> Result<Series> {
    let column = df.column(name).map_err(|_| {
        ProcessorError::malformed_source(source_name, format!("missing required column '{}'", name))
    })?;
    let series = column.as_materialized_series();

    match series.dtype() {
        DataType::String => Ok(series.clone()),
        dtype if dtype.is_integer() || dtype.is_float() || dtype.is_bool() || dtype.is_null() => {
            Ok(series.cast(&DataType::String)?)
        }
        dtype => Err(ProcessorError::malformed_source(
            source_name,
            format!("column '{}' has unsupported type {}", name, dtype),
        )),
    }
}
