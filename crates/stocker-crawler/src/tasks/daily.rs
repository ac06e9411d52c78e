//! End-of-day statistics.
//!
//! ```text
//! scanner(today) ─► stored codes ─┐
//! realtime list ──────────────────┴─► pending codes
//!                                        │  N rate-limited fetchers
//!                                        ▼
//!                                  BoundedQueue ─► row builder ─► add (one batch) ─► notify predictor
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use stocker_core::error::{Result, StockerError};
use stocker_hbase::{Column, HBaseClient, Row, ScanOptions};
use stocker_scheduler::{BoundedQueue, ExclusiveTask, RunOutcome};

use super::{CrawlerContext, daily_row, require_table};
use crate::calendar::{day_bounds, in_daily_window, is_trading_day};
use crate::models::StockDailyStatisticsInfo;

pub const NAME: &str = "daily";
pub const INTERVAL: u64 = 60;

/// Collects today's statistics for every stock not stored yet today.
pub struct DailyStatCrawler {
    ctx: CrawlerContext,
}

impl DailyStatCrawler {
    pub fn new(ctx: CrawlerContext) -> Result<Self> {
        require_table(NAME, &ctx.tables.daily)?;
        Ok(Self { ctx })
    }

    /// Row keys already written to the daily table within `[start, end)`.
    async fn stored_codes(&self, client: &HBaseClient, start: i64, end: i64) -> Result<HashSet<String>> {
        let options = ScanOptions::new()
            .column(Column::new("date", "date"))
            .time_range(start, end);
        let mut scanner = client.open_scanner(&self.ctx.tables.daily, Some(&options)).await?;
        let rows = scanner.collect_remaining().await;
        scanner.close().await;
        Ok(rows?.into_iter().map(|row| row.key).collect())
    }

    /// Fetch `day`'s statistics for `codes`, fanning out over the configured
    /// number of fetchers and funnelling results through a bounded queue.
    async fn fetch_statistics(&self, codes: Vec<String>, day: NaiveDate) -> Result<Vec<StockDailyStatisticsInfo>> {
        let expected = codes.len();
        let queue: BoundedQueue<Option<StockDailyStatisticsInfo>> =
            BoundedQueue::new(self.ctx.queue_capacity.max(1))?;
        let work = Mutex::new(VecDeque::from(codes));

        let queue = &queue;
        let work = &work;
        let provider = &self.ctx.provider;

        let fetchers = (0..self.ctx.producers.max(1)).map(move |_| async move {
            loop {
                let next = work
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .pop_front();
                let Some(code) = next else {
                    return Ok::<(), StockerError>(());
                };
                // One message per code, so the builder knows when it has seen them all.
                let stat = match provider.daily_statistics(&code, day, day).await {
                    Ok(days) => days.into_iter().next(),
                    Err(e) => {
                        tracing::warn!("⚠️ Daily statistics for {code} unavailable: {e}");
                        None
                    }
                };
                queue.enqueue(stat).await?;
            }
        });
        let fetchers = futures::future::try_join_all(fetchers);

        let builder = async move {
            let mut stats = Vec::new();
            for _ in 0..expected {
                if let Some(stat) = queue.dequeue().await? {
                    stats.push(stat);
                }
            }
            Ok::<_, StockerError>(stats)
        };

        let (_, stats) = tokio::try_join!(fetchers, builder)?;
        Ok(stats)
    }
}

#[async_trait]
impl ExclusiveTask for DailyStatCrawler {
    async fn run_exclusive(&self) -> Result<RunOutcome> {
        let now = self.ctx.clock.now();
        if !is_trading_day(now.date_naive()) || !in_daily_window(now.time()) {
            tracing::debug!("Outside the daily statistics window ({now}), skipping");
            return Ok(RunOutcome::Skipped);
        }

        let stocks = self.ctx.provider.realtime_stocks().await?;
        tracing::info!("📋 Stock list fetched: {} codes", stocks.len());
        if stocks.is_empty() {
            return Ok(RunOutcome::Skipped);
        }

        let client = self.ctx.hbase.create();
        let (start, end) = day_bounds(&now);
        let stored = self.stored_codes(&client, start, end).await?;

        let mut seen = HashSet::new();
        let pending: Vec<String> = stocks
            .into_iter()
            .map(|s| s.code)
            .filter(|code| !code.is_empty() && !stored.contains(code) && seen.insert(code.clone()))
            .collect();
        if pending.is_empty() {
            tracing::info!("✅ Daily statistics already stored for all {} codes", stored.len());
            return Ok(RunOutcome::Completed);
        }

        let stats = self.fetch_statistics(pending, now.date_naive()).await?;
        if stats.is_empty() {
            tracing::warn!("⚠️ No daily statistics available yet for {}", now.date_naive());
            return Ok(RunOutcome::Completed);
        }

        let rows: Vec<Row> = stats.iter().map(|stat| daily_row(stat, &now)).collect();
        let table = &self.ctx.tables.daily;
        client.add(table, &rows).await?;
        tracing::info!("📊 Stored daily statistics for {} stocks → '{table}'", rows.len());

        if let Err(e) = self.ctx.notifier.notify().await {
            tracing::warn!("⚠️ Failed to notify predictor: {e}");
        }
        Ok(RunOutcome::Completed)
    }
}
