//! Completion ledger for run-once jobs.
//! Optionally persisted as a small JSON file so a finished backfill is not
//! repeated after a restart.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use stocker_core::error::Result;

/// Set of run-once job names that have completed.
#[derive(Debug, Default)]
pub struct CompletionLedger {
    completed: BTreeSet<String>,
    path: Option<PathBuf>,
}

impl CompletionLedger {
    /// In-memory ledger; forgotten on restart.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Ledger backed by `path`. A missing file starts empty; an unreadable one
    /// is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let completed = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("⚠️ Failed to parse ledger {}: {e}", path.display());
                BTreeSet::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                tracing::warn!("⚠️ Failed to read ledger {}: {e}", path.display());
                BTreeSet::new()
            }
        };
        Self {
            completed,
            path: Some(path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_completed(&self, name: &str) -> bool {
        self.completed.contains(name)
    }

    /// Record `name` as done and persist the ledger if it is file-backed.
    pub fn mark_completed(&mut self, name: &str) -> Result<()> {
        if !self.completed.insert(name.to_string()) {
            return Ok(());
        }
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(&self.completed)?;
            std::fs::write(path, json)?;
            tracing::debug!("💾 Ledger saved: {} job(s) → {}", self.completed.len(), path.display());
        }
        Ok(())
    }

    pub fn completed(&self) -> impl Iterator<Item = &str> {
        self.completed.iter().map(String::as_str)
    }
}
