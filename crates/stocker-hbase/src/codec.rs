//! Wire codec for the HBase REST gateway ("stargate") JSON format.
//!
//! Every row key, column identifier and cell payload is base64 on the wire:
//!
//! ```text
//! {"Row":[{"key":"c2g2MDAwMDA=",
//!          "Cell":[{"column":"cHJpY2U6cHJpY2U=","timestamp":1,"$":"MTAuNQ=="}]}]}
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use stocker_core::error::{Result, StockerError};

use crate::model::{Cell, Column, Row};
use crate::options::ScanOptions;

// ─── base64 field helpers ─────────────────────────────────

fn encode_str<S: Serializer>(value: &str, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(value.as_bytes()))
}

fn encode_bytes<S: Serializer>(value: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(value))
}

fn encode_opt_str<S: Serializer>(
    value: &Option<&str>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(v) => encode_str(v, serializer),
        None => serializer.serialize_none(),
    }
}

fn decode_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    BASE64.decode(encoded.as_bytes()).map_err(de::Error::custom)
}

fn decode_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let bytes = decode_bytes(deserializer)?;
    String::from_utf8(bytes).map_err(de::Error::custom)
}

/// The gateway sometimes renders timestamps as floats; accept both and truncate.
fn decode_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    struct TimestampVisitor;

    impl Visitor<'_> for TimestampVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("an integer or floating-point timestamp")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<i64, E> {
            i64::try_from(v).map_err(E::custom)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<i64, E> {
            if v.is_finite() {
                Ok(v.trunc() as i64)
            } else {
                Err(E::custom("timestamp is not a finite number"))
            }
        }
    }

    deserializer.deserialize_any(TimestampVisitor)
}

// ─── Column ───────────────────────────────────────────────

impl Serialize for Column {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        encode_str(self.as_str(), serializer)
    }
}

impl<'de> Deserialize<'de> for Column {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let identifier = decode_string(deserializer)?;
        Ok(Column::parse(&identifier))
    }
}

// ─── Cell ─────────────────────────────────────────────────

#[derive(Serialize)]
struct CellOut<'a> {
    column: &'a Column,
    timestamp: i64,
    #[serde(rename = "$", serialize_with = "encode_bytes")]
    data: &'a [u8],
}

#[derive(Deserialize)]
struct CellIn {
    column: Column,
    #[serde(default, deserialize_with = "decode_timestamp")]
    timestamp: i64,
    #[serde(rename = "$", default, deserialize_with = "decode_bytes")]
    data: Vec<u8>,
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        CellOut {
            column: &self.column,
            timestamp: self.timestamp,
            data: &self.data,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = CellIn::deserialize(deserializer)?;
        Ok(Cell::new(wire.column, wire.timestamp, wire.data))
    }
}

// ─── Row ──────────────────────────────────────────────────

#[derive(Serialize)]
struct RowOut<'a> {
    #[serde(serialize_with = "encode_str")]
    key: &'a str,
    #[serde(rename = "Cell")]
    cells: Vec<&'a Cell>,
}

#[derive(Deserialize)]
struct RowIn {
    #[serde(deserialize_with = "decode_string")]
    key: String,
    #[serde(rename = "Cell", default)]
    cells: Vec<Cell>,
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        RowOut {
            key: &self.key,
            cells: self.cells.iter().collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = RowIn::deserialize(deserializer)?;
        let mut row = Row::new(wire.key);
        row.cells.extend(wire.cells);
        Ok(row)
    }
}

// ─── Row collections ──────────────────────────────────────

#[derive(Serialize)]
struct RowSetOut<'a> {
    #[serde(rename = "Row")]
    rows: &'a [Row],
}

#[derive(Deserialize)]
struct RowSetIn {
    #[serde(rename = "Row", default)]
    rows: Vec<Row>,
}

/// Encode rows as the `{"Row": [...]}` request body.
pub fn encode_rows(rows: &[Row]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&RowSetOut { rows })?)
}

/// Decode a `{"Row": [...]}` response body. An empty body holds no rows.
pub fn decode_rows(body: &[u8]) -> Result<Vec<Row>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let set: RowSetIn = serde_json::from_slice(body).map_err(StockerError::decode)?;
    Ok(set.rows)
}

// ─── Scanner creation payload ─────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScannerOut<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    column: Vec<&'a Column>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "encode_opt_str")]
    start_row: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "encode_opt_str")]
    end_row: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<i64>,
    batch: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_versions: Option<u32>,
}

/// Encode the scanner creation payload; `batch` falls back to the default.
pub fn encode_scan_options(options: &ScanOptions) -> Result<Vec<u8>> {
    let wire = ScannerOut {
        column: options.columns.iter().collect(),
        start_row: options.start_row.as_deref().filter(|r| !r.is_empty()),
        end_row: options.end_row.as_deref().filter(|r| !r.is_empty()),
        start_time: options.start_time,
        end_time: options.end_time,
        batch: options.effective_batch(),
        max_versions: options.max_versions,
    };
    Ok(serde_json::to_vec(&wire)?)
}
