//! Market-data source.
//!
//! The upstream API answers every call with an envelope:
//! ```text
//! {"error_code": 0, "message": "...", "data": <object | array>}
//! ```
//! A non-zero `error_code`, a missing `data` member or a non-2xx status all
//! mean "no data this time": the provider logs them and returns an empty list.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;

use stocker_core::config::ShenjianConfig;
use stocker_core::error::{Result, StockerError};
use stocker_scheduler::RateLimiter;

use crate::models::{StockDailyStatisticsInfo, StockRealtimeInfo};

/// Where the crawler jobs get their numbers from.
#[async_trait]
pub trait StockInfoProvider: Send + Sync {
    /// The full realtime stock list.
    async fn realtime_stocks(&self) -> Result<Vec<StockRealtimeInfo>>;

    /// Daily statistics of `code` for every trading day in `[start, end]`.
    async fn daily_statistics(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<StockDailyStatisticsInfo>>;
}

/// Provider backed by the shenjian.io data API.
pub struct ShenjianProvider {
    base_url: String,
    stock_list_app_id: String,
    stock_daily_stat_app_id: String,
    limiter: Arc<RateLimiter>,
    client: reqwest::Client,
}

impl ShenjianProvider {
    pub fn new(
        base_url: impl Into<String>,
        stock_list_app_id: impl Into<String>,
        stock_daily_stat_app_id: impl Into<String>,
        limiter: Arc<RateLimiter>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StockerError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            stock_list_app_id: stock_list_app_id.into(),
            stock_daily_stat_app_id: stock_daily_stat_app_id.into(),
            limiter,
            client,
        })
    }

    /// Build from `[shenjian]`, resolving app ids from the environment when unset.
    pub fn from_config(config: &ShenjianConfig) -> Result<Self> {
        let list_id = config.resolved_stock_list_app_id().ok_or_else(|| {
            StockerError::Config(
                "shenjian.stock_list_app_id is not set (or SHENJIAN_STOCK_LIST_APPID)".into(),
            )
        })?;
        let daily_id = config.resolved_stock_daily_stat_app_id().ok_or_else(|| {
            StockerError::Config(
                "shenjian.stock_daily_stat_app_id is not set (or SHENJIAN_STOCK_DAILY_STAT_APPID)"
                    .into(),
            )
        })?;
        let limiter = RateLimiter::new(
            config.max_concurrent,
            Duration::from_millis(config.min_spacing_ms),
        )?;
        Self::new(
            config.base_url.clone(),
            list_id,
            daily_id,
            Arc::new(limiter),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// GET `{base}?appid=..&extra..` under the rate limiter and unwrap the envelope.
    async fn fetch<T: DeserializeOwned>(
        &self,
        what: &str,
        app_id: &str,
        extra: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let body = self
            .limiter
            .run(move || async move {
                let resp = self
                    .client
                    .get(&self.base_url)
                    .query(&[("appid", app_id)])
                    .query(extra)
                    .send()
                    .await
                    .map_err(|e| StockerError::Transport(format!("{what}: {e}")))?;
                let status = resp.status();
                if !status.is_success() {
                    tracing::error!("❌ Upstream returned HTTP {status} for {what}");
                    return Ok(None);
                }
                let text = resp
                    .text()
                    .await
                    .map_err(|e| StockerError::Transport(format!("{what}: {e}")))?;
                Ok::<_, StockerError>(Some(text))
            })
            .await?;

        match body {
            Some(text) => unwrap_envelope(what, &text),
            None => Ok(Vec::new()),
        }
    }
}

/// Pull the records out of an upstream envelope.
pub(crate) fn unwrap_envelope<T: DeserializeOwned>(what: &str, body: &str) -> Result<Vec<T>> {
    let mut envelope: Value = serde_json::from_str(body)
        .map_err(|e| StockerError::Decode(format!("{what}: {e}")))?;

    let code = envelope.get("error_code").and_then(Value::as_i64).unwrap_or(0);
    if code != 0 {
        let message = envelope
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        tracing::error!("❌ Upstream error {code} for {what}: {message}");
        return Ok(Vec::new());
    }

    let Some(data) = envelope.get_mut("data").map(Value::take) else {
        tracing::warn!("⚠️ Upstream response for {what} has no data member");
        return Ok(Vec::new());
    };
    let records = match data {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<T>, _>>()
            .map_err(|e| StockerError::Decode(format!("{what}: {e}")))?,
        single => vec![
            serde_json::from_value(single).map_err(|e| StockerError::Decode(format!("{what}: {e}")))?,
        ],
    };
    Ok(records)
}

fn format_query_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%-d").to_string()
}

#[async_trait]
impl StockInfoProvider for ShenjianProvider {
    async fn realtime_stocks(&self) -> Result<Vec<StockRealtimeInfo>> {
        let stocks = self
            .fetch("realtime stock list", &self.stock_list_app_id, &[])
            .await?;
        tracing::debug!("📈 Realtime list: {} stocks", stocks.len());
        Ok(stocks)
    }

    async fn daily_statistics(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<StockDailyStatisticsInfo>> {
        if code.is_empty() {
            return Err(StockerError::InvalidArgument("stock code is empty".into()));
        }
        if start > end {
            return Err(StockerError::InvalidArgument(format!(
                "start date {start} is after end date {end}"
            )));
        }
        let extra = [
            ("code", code.to_string()),
            ("start_date", format_query_date(start)),
            ("end_date", format_query_date(end)),
            ("index", "false".to_string()),
            ("k_type", "day".to_string()),
            ("fq_type", "qfq".to_string()),
        ];
        let what = format!("daily statistics of {code}");
        let mut days: Vec<StockDailyStatisticsInfo> = self
            .fetch(&what, &self.stock_daily_stat_app_id, &extra)
            .await?;
        // Some responses omit the code on each record.
        for day in &mut days {
            if day.code.is_empty() {
                day.code = code.to_string();
            }
        }
        Ok(days)
    }
}
