//! HBase REST gateway client: add, find, open scanner.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};

use stocker_core::config::HBaseConfig;
use stocker_core::error::{Result, StockerError};

use crate::codec;
use crate::model::Row;
use crate::options::{FindOptions, ScanOptions};
use crate::scanner::Scanner;
use crate::transport::{self, JSON};

/// Creates [`HBaseClient`]s bound to one gateway.
#[derive(Debug, Clone)]
pub struct HBaseClientFactory {
    base_url: Url,
    timeout: Duration,
}

impl HBaseClientFactory {
    /// Create a factory for the gateway at `base_url` (e.g. `http://hbase:8080`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StockerError::Config(format!("Invalid HBase gateway URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StockerError::Config(format!(
                "HBase gateway URL '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self { base_url, timeout })
    }

    pub fn from_config(config: &HBaseConfig) -> Result<Self> {
        Self::new(&config.base_url(), Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn create(&self) -> HBaseClient {
        HBaseClient {
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            disposed: false,
        }
    }
}

/// Stateless gateway client. Each call opens its own transport and drops it
/// when the call completes; the client itself only remembers where to go.
#[derive(Debug)]
pub struct HBaseClient {
    base_url: Url,
    timeout: Duration,
    disposed: bool,
}

impl HBaseClient {
    fn ensure_not_disposed(&self) -> Result<()> {
        if self.disposed {
            return Err(StockerError::Disposed("HBaseClient"));
        }
        Ok(())
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StockerError::Config(format!("Invalid HBase gateway URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Write `rows` to `table` in a single request. The batch succeeds or fails as a whole.
    pub async fn add(&self, table: &str, rows: &[Row]) -> Result<()> {
        self.ensure_not_disposed()?;
        if rows.is_empty() {
            tracing::debug!("HBase add to '{table}' skipped: no rows");
            return Ok(());
        }

        let url = self.url(&[table, "row_key"])?;
        let context = format!("PUT {table}/row_key");
        let body = codec::encode_rows(rows)?;
        let resp = transport::build(self.timeout)?
            .put(url)
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON)
            .body(body)
            .send()
            .await
            .map_err(|e| transport::send_error(&context, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StockerError::protocol(status.as_u16(), context));
        }
        tracing::debug!("💾 HBase add: {} rows → '{table}'", rows.len());
        Ok(())
    }

    /// Fetch one row. `Ok(None)` when the gateway has no such row.
    pub async fn find(
        &self,
        table: &str,
        row_key: &str,
        options: Option<&FindOptions>,
    ) -> Result<Option<Row>> {
        self.ensure_not_disposed()?;

        let timestamp;
        let mut segments = vec![table, row_key];
        if let Some(opts) = options {
            if let Some(column) = &opts.column {
                segments.push(column.as_str());
            }
            if let Some(ts) = opts.timestamp {
                timestamp = ts.to_string();
                segments.push(&timestamp);
            }
        }
        let mut url = self.url(&segments)?;
        if let Some(versions) = options.and_then(|o| o.versions) {
            url.query_pairs_mut()
                .append_pair("v", &versions.to_string());
        }

        let context = format!("GET {table}/{row_key}");
        let resp = transport::build(self.timeout)?
            .get(url)
            .header(ACCEPT, JSON)
            .send()
            .await
            .map_err(|e| transport::send_error(&context, e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = transport::success_body(resp, &context).await?;
        Ok(codec::decode_rows(&body)?.into_iter().next())
    }

    /// Create a server-side scanner over `table`.
    pub async fn open_scanner(&self, table: &str, options: Option<&ScanOptions>) -> Result<Scanner> {
        self.ensure_not_disposed()?;

        let default_options = ScanOptions::default();
        let options = options.unwrap_or(&default_options);
        let url = self.url(&[table, "scanner"])?;
        let context = format!("PUT {table}/scanner");
        let body = codec::encode_scan_options(options)?;
        let resp = transport::build(self.timeout)?
            .put(url)
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON)
            .body(body)
            .send()
            .await
            .map_err(|e| transport::send_error(&context, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StockerError::protocol(status.as_u16(), context));
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| StockerError::MissingHeader {
                header: "Location",
                context: context.clone(),
            })?;
        let endpoint = self
            .base_url
            .join(location)
            .map_err(|e| StockerError::Decode(format!("{context}: invalid Location '{location}': {e}")))?;

        tracing::debug!("🔭 Scanner opened on '{table}': {endpoint}");
        Ok(Scanner::new(endpoint, self.timeout))
    }

    /// Mark the client unusable. Further calls fail with a lifecycle error.
    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
