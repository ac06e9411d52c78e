//! # Stocker HBase
//!
//! Client for the HBase REST gateway ("stargate").
//!
//! ## Wire format
//! ```text
//! {"Row":[{"key":"<b64 row key>",
//!          "Cell":[{"column":"<b64 family:qualifier>","timestamp":<ms>,"$":"<b64 value>"}]}]}
//! ```
//!
//! ## Operations
//! - `PUT    {table}/row_key`             : write a batch of rows
//! - `GET    {table}/{key}[/{col}[/{ts}]]` : fetch one row
//! - `PUT    {table}/scanner`             : open a scanner (resource URL in `Location`)
//! - `GET    {scanner}` / `DELETE {scanner}` : page through / release it

pub mod client;
pub mod codec;
pub mod model;
pub mod options;
pub mod scanner;
mod transport;

#[cfg(test)]
mod testing;

pub use client::{HBaseClient, HBaseClientFactory};
pub use model::{Cell, Column, Row, RowCells};
pub use options::{DEFAULT_SCAN_BATCH, FindOptions, ScanOptions};
pub use scanner::{Scanner, ScannerState};
