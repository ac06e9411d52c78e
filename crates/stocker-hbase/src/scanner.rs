//! Server-side scanner: a paginated cursor bound to a gateway resource.
//!
//! ```text
//! PUT {table}/scanner ──► Location ──► Open ──GET──► Open … ──204──► Exhausted
//!                                        └──────────── close() / drop ──► Released (DELETE)
//! ```

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::header::ACCEPT;

use stocker_core::error::{Result, StockerError};

use crate::codec;
use crate::model::Row;
use crate::transport::{self, JSON};

/// Lifecycle of a [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    /// More pages may be available.
    Open,
    /// The gateway signalled the end of the scan.
    Exhausted,
    /// The server resource has been released; the scanner is unusable.
    Released,
}

/// Cursor over a server-side scan.
///
/// Call [`Scanner::close`] when done. A scanner dropped while still holding
/// its server resource releases it in the background on the current tokio
/// runtime, if there is one.
#[derive(Debug)]
pub struct Scanner {
    endpoint: Url,
    timeout: Duration,
    state: ScannerState,
    batch: Vec<Row>,
}

impl Scanner {
    pub(crate) fn new(endpoint: Url, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            state: ScannerState::Open,
            batch: Vec::new(),
        }
    }

    /// The scanner resource URL returned by the gateway.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    fn ensure_not_released(&self) -> Result<()> {
        if self.state == ScannerState::Released {
            return Err(StockerError::Disposed("Scanner"));
        }
        Ok(())
    }

    /// Fetch the next page. Returns `false` once the scan is exhausted; calling
    /// again after that keeps returning `false` without touching the network.
    /// A failed fetch leaves the scanner state untouched so the caller may retry.
    pub async fn read_next_batch(&mut self) -> Result<bool> {
        self.ensure_not_released()?;
        if self.state == ScannerState::Exhausted {
            return Ok(false);
        }

        let context = format!("GET {}", self.endpoint);
        let resp = transport::build(self.timeout)?
            .get(self.endpoint.clone())
            .header(ACCEPT, JSON)
            .send()
            .await
            .map_err(|e| transport::send_error(&context, e))?;

        if resp.status() == StatusCode::NO_CONTENT {
            self.exhaust();
            return Ok(false);
        }

        let body = transport::success_body(resp, &context).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            self.exhaust();
            return Ok(false);
        }

        self.batch = codec::decode_rows(&body)?;
        tracing::debug!("📄 Scanner page: {} rows from {}", self.batch.len(), self.endpoint);
        Ok(true)
    }

    fn exhaust(&mut self) {
        if self.state != ScannerState::Exhausted {
            tracing::debug!("🏁 Scanner exhausted: {}", self.endpoint);
        }
        self.batch.clear();
        self.state = ScannerState::Exhausted;
    }

    /// The most recently fetched page; empty before the first fetch and after exhaustion.
    pub fn current_batch(&self) -> Result<&[Row]> {
        self.ensure_not_released()?;
        Ok(&self.batch)
    }

    /// Move the current page out of the scanner.
    pub fn take_batch(&mut self) -> Result<Vec<Row>> {
        self.ensure_not_released()?;
        Ok(std::mem::take(&mut self.batch))
    }

    /// Drain every remaining page into one vector.
    pub async fn collect_remaining(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while self.read_next_batch().await? {
            rows.append(&mut self.batch);
        }
        Ok(rows)
    }

    /// Release the server resource. Failures are logged, never returned.
    pub async fn close(&mut self) {
        if self.state == ScannerState::Released {
            return;
        }
        self.state = ScannerState::Released;
        self.batch.clear();
        if let Err(e) = release(&self.endpoint, self.timeout).await {
            tracing::warn!("⚠️ Failed to release scanner {}: {e}", self.endpoint);
        }
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        if self.state == ScannerState::Released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("⚠️ Scanner {} dropped outside a runtime; not released", self.endpoint);
            return;
        };
        let endpoint = self.endpoint.clone();
        let timeout = self.timeout;
        handle.spawn(async move {
            if let Err(e) = release(&endpoint, timeout).await {
                tracing::warn!("⚠️ Failed to release dropped scanner {endpoint}: {e}");
            }
        });
    }
}

async fn release(endpoint: &Url, timeout: Duration) -> Result<()> {
    let context = format!("DELETE {endpoint}");
    let resp = transport::build(timeout)?
        .delete(endpoint.clone())
        .header(ACCEPT, JSON)
        .send()
        .await
        .map_err(|e| transport::send_error(&context, e))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(StockerError::protocol(status.as_u16(), context));
    }
    tracing::debug!("🧹 Scanner released: {endpoint}");
    Ok(())
}
