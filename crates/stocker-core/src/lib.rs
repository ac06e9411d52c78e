//! # Stocker Core
//!
//! Shared building blocks for the Stocker workspace: the error taxonomy used by
//! every crate and the TOML configuration loaded by the binary.

pub mod config;
pub mod error;

pub use config::StockerConfig;
pub use error::{Result, StockerError};
