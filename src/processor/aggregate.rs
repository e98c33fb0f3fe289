//! Grouped mean aggregation over annotated records.
//!
//! Records are grouped by `(station_id, kind)`; unmatched records are
//! skipped. Large inputs are split into fixed-size chunks that are summed
//! on the rayon pool and merged back in chunk order, so the result does not
//! depend on thread count or scheduling.

use crate::models::AnnotatedRecord;
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Records per partial aggregation chunk
const AGGREGATE_CHUNK_ROWS: usize = 64 * 1024;

/// Name of the station column in the tabular summary
pub const STATION_ID_COLUMN: &str = "station_id";

/// Running sum and count for one `(station, kind)` group
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct GroupMean {
    sum: f64,
    count: usize,
}

impl GroupMean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn merge(&mut self, other: GroupMean) {
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Sparse per-station, per-kind means.
///
/// A cell only exists when at least one record contributed to it; a
/// missing cell means no data, not zero.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SummaryTable {
    cells: BTreeMap<(String, String), GroupMean>,
}

impl SummaryTable {
    /// Mean for a station and kind, if any record contributed
    pub fn get(&self, station_id: &str, kind: &str) -> Option<f64> {
        self.cells
            .get(&(station_id.to_string(), kind.to_string()))
            .map(GroupMean::mean)
    }

    /// Number of records averaged into a cell
    pub fn count(&self, station_id: &str, kind: &str) -> usize {
        self.cells
            .get(&(station_id.to_string(), kind.to_string()))
            .map_or(0, GroupMean::count)
    }

    /// Stations with at least one cell, sorted
    pub fn stations(&self) -> Vec<&str> {
        let stations: BTreeSet<&str> = self.cells.keys().map(|(s, _)| s.as_str()).collect();
        stations.into_iter().collect()
    }

    /// Kinds observed anywhere in the input, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let kinds: BTreeSet<&str> = self.cells.keys().map(|(_, k)| k.as_str()).collect();
        kinds.into_iter().collect()
    }

    /// Iterate `(station, kind, mean)` in station then kind order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.cells
            .iter()
            .map(|((station, kind), group)| (station.as_str(), kind.as_str(), group.mean()))
    }

    /// `(rows, columns)` where rows are stations and columns observed kinds
    pub fn shape(&self) -> (usize, usize) {
        (self.stations().len(), self.kinds().len())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of populated cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Means nested by station, then kind
    pub fn to_nested(&self) -> BTreeMap<String, BTreeMap<String, f64>> {
        let mut nested: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for (station, kind, mean) in self.iter() {
            nested
                .entry(station.to_string())
                .or_default()
                .insert(kind.to_string(), mean);
        }
        nested
    }

    /// Wide frame: a station column followed by one nullable column per kind
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let stations = self.stations();
        let mut columns = Vec::with_capacity(self.kinds().len() + 1);
        columns.push(Column::new(
            STATION_ID_COLUMN.into(),
            stations.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        ));

        for kind in self.kinds() {
            let values: Vec<Option<f64>> = stations
                .iter()
                .map(|station| self.get(station, kind))
                .collect();
            columns.push(Column::new(kind.into(), values));
        }

        DataFrame::new(columns)
    }
}

/// Group matched records by `(station_id, kind)` and average their values
pub fn aggregate(records: &[AnnotatedRecord]) -> SummaryTable {
    aggregate_with_workers(records, num_cpus::get())
}

/// Like [`aggregate`], but sums every chunk on the calling thread when
/// `workers` is 1. Otherwise chunks go to the global rayon pool.
///
/// Chunk boundaries do not depend on `workers`, so the table is the same
/// either way.
pub fn aggregate_with_workers(records: &[AnnotatedRecord], workers: usize) -> SummaryTable {
    let partials: Vec<HashMap<(String, String), GroupMean>> = if workers > 1 {
        records
            .par_chunks(AGGREGATE_CHUNK_ROWS)
            .map(aggregate_chunk)
            .collect()
    } else {
        records
            .chunks(AGGREGATE_CHUNK_ROWS)
            .map(aggregate_chunk)
            .collect()
    };

    let mut cells = BTreeMap::new();
    for partial in partials {
        merge_partial(&mut cells, partial);
    }

    SummaryTable { cells }
}

fn aggregate_chunk(chunk: &[AnnotatedRecord]) -> HashMap<(String, String), GroupMean> {
    let mut groups: HashMap<(String, String), GroupMean> = HashMap::new();
    for record in chunk {
        let Some(measurement) = &record.measurement else {
            continue;
        };
        groups
            .entry((record.station_id().to_string(), measurement.kind.clone()))
            .or_default()
            .add(measurement.value);
    }
    groups
}

fn merge_partial(
    cells: &mut BTreeMap<(String, String), GroupMean>,
    partial: HashMap<(String, String), GroupMean>,
) {
    for (key, group) in partial {
        cells.entry(key).or_default().merge(group);
    }
}
