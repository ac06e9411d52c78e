//! Column / Cell / Row: the HBase data model as plain value types.
//!
//! A [`Row`] indexes its cells by [`Column`]; every column bucket keeps its
//! versions ordered by timestamp. Writes that share a timestamp are all kept,
//! in insertion order, so concurrent writers never lose data to each other.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// A `family:qualifier` pair.
///
/// Equality, ordering and hashing all go through the canonical string form, so
/// two columns are interchangeable exactly when their identifiers match.
#[derive(Debug, Clone)]
pub struct Column {
    family: String,
    qualifier: String,
    id: String,
}

impl Column {
    pub fn new(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        let family = family.into();
        let qualifier = qualifier.into();
        let id = format!("{family}:{qualifier}");
        Self {
            family,
            qualifier,
            id,
        }
    }

    /// Parse a column identifier, splitting on the first `:`.
    /// An identifier without `:` is a bare family with an empty qualifier.
    pub fn parse(identifier: &str) -> Self {
        match identifier.split_once(':') {
            Some((family, qualifier)) => Self::new(family, qualifier),
            None => Self::new(identifier, ""),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    /// Canonical `family:qualifier` identifier.
    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Column {}

impl Hash for Column {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Column {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Column {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Borrow<str> for Column {
    fn borrow(&self) -> &str {
        &self.id
    }
}

/// One versioned value of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub column: Column,
    /// Version marker; the crawler writes epoch milliseconds.
    pub timestamp: i64,
    pub data: Vec<u8>,
}

impl Cell {
    pub fn new(column: Column, timestamp: i64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            column,
            timestamp,
            data: data.into(),
        }
    }

    /// Payload as UTF-8, if it is valid UTF-8.
    pub fn data_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Cells of a row, bucketed by column and ordered by timestamp within a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowCells {
    columns: BTreeMap<Column, Vec<Cell>>,
}

impl RowCells {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cell after every existing version with a timestamp `<=` its own.
    pub fn add(&mut self, cell: Cell) {
        let versions = self.columns.entry(cell.column.clone()).or_default();
        let at = versions.partition_point(|c| c.timestamp <= cell.timestamp);
        versions.insert(at, cell);
    }

    /// All versions of `family:qualifier`, oldest first.
    pub fn get(&self, family: &str, qualifier: &str) -> &[Cell] {
        self.get_column(&format!("{family}:{qualifier}"))
    }

    /// All versions of a column by identifier, oldest first.
    pub fn get_column(&self, identifier: &str) -> &[Cell] {
        self.columns
            .get(identifier)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Newest version of `family:qualifier`.
    pub fn latest(&self, family: &str, qualifier: &str) -> Option<&Cell> {
        self.get(family, qualifier).last()
    }

    pub fn contains(&self, cell: &Cell) -> bool {
        self.get_column(cell.column.as_str()).contains(cell)
    }

    /// Remove the first stored cell equal to `cell`.
    pub fn remove(&mut self, cell: &Cell) -> bool {
        let Some(versions) = self.columns.get_mut(cell.column.as_str()) else {
            return false;
        };
        let Some(pos) = versions.iter().position(|c| c == cell) else {
            return false;
        };
        versions.remove(pos);
        if versions.is_empty() {
            self.columns.remove(cell.column.as_str());
        }
        true
    }

    pub fn clear(&mut self) {
        self.columns.clear();
    }

    /// Total number of cells across all columns.
    pub fn len(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.keys()
    }

    /// Every cell, grouped by column, oldest first within a column.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.columns.values().flatten()
    }
}

impl Extend<Cell> for RowCells {
    fn extend<I: IntoIterator<Item = Cell>>(&mut self, iter: I) {
        for cell in iter {
            self.add(cell);
        }
    }
}

impl FromIterator<Cell> for RowCells {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        let mut cells = Self::new();
        cells.extend(iter);
        cells
    }
}

/// A row key with its cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub key: String,
    pub cells: RowCells,
}

impl Row {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cells: RowCells::new(),
        }
    }

    /// Builder-style cell insertion.
    pub fn with_cell(mut self, cell: Cell) -> Self {
        self.cells.add(cell);
        self
    }

    /// Add a value for `column` at `timestamp`.
    pub fn put(&mut self, column: Column, timestamp: i64, data: impl Into<Vec<u8>>) -> &mut Self {
        self.cells.add(Cell::new(column, timestamp, data));
        self
    }

    /// Newest value of `family:qualifier` as UTF-8.
    pub fn latest_str(&self, family: &str, qualifier: &str) -> Option<&str> {
        self.cells
            .latest(family, qualifier)
            .and_then(Cell::data_str)
    }
}
