//! Request options for `find` and `open_scanner`.

use crate::model::Column;

/// Rows per scanner page when the caller does not say otherwise.
pub const DEFAULT_SCAN_BATCH: u32 = 100;

/// Optional narrowing of a single-row lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub column: Option<Column>,
    pub timestamp: Option<i64>,
    /// Number of versions per cell (`?v=`).
    pub versions: Option<u32>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, column: Column) -> Self {
        self.column = Some(column);
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn versions(mut self, versions: u32) -> Self {
        self.versions = Some(versions);
        self
    }
}

/// Scanner creation options. Every unset field means "no constraint".
///
/// This type only travels towards the gateway; it is never decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub columns: Vec<Column>,
    pub start_row: Option<String>,
    pub end_row: Option<String>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    /// Page size; the gateway decides whether it counts rows or cells.
    pub batch: Option<u32>,
    pub max_versions: Option<u32>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn start_row(mut self, key: impl Into<String>) -> Self {
        self.start_row = Some(key.into());
        self
    }

    pub fn end_row(mut self, key: impl Into<String>) -> Self {
        self.end_row = Some(key.into());
        self
    }

    /// Restrict to cells with `start <= timestamp < end`.
    pub fn time_range(mut self, start: i64, end: i64) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn batch(mut self, batch: u32) -> Self {
        self.batch = Some(batch);
        self
    }

    pub fn max_versions(mut self, versions: u32) -> Self {
        self.max_versions = Some(versions);
        self
    }

    /// Batch size actually sent to the gateway.
    pub fn effective_batch(&self) -> u32 {
        self.batch.unwrap_or(DEFAULT_SCAN_BATCH)
    }
}
