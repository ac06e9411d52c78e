//! One-off backfill of past daily statistics.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use futures::StreamExt;

use stocker_core::error::{Result, StockerError};
use stocker_hbase::Row;
use stocker_scheduler::{ExclusiveTask, RunOutcome};

use super::{CrawlerContext, daily_row, require_table};
use crate::calendar::day_start;
use crate::models::StockDailyStatisticsInfo;

pub const NAME: &str = "history";
pub const INTERVAL: u64 = 1;

type History = BTreeMap<String, Vec<StockDailyStatisticsInfo>>;

/// Fetches `history.years` of daily statistics for every stock and stores each
/// day under its own timestamp. Registered as run-once: an empty stock list or
/// an empty fetch reports `Skipped`, and an unreachable upstream fails the run,
/// so the backfill is retried on the next tick either way.
pub struct HistoryCrawler {
    ctx: CrawlerContext,
}

impl HistoryCrawler {
    pub fn new(ctx: CrawlerContext) -> Result<Self> {
        require_table(NAME, &ctx.tables.daily)?;
        Ok(Self { ctx })
    }

    /// Fetch every stock's history. An unreachable upstream fails the whole
    /// fetch; other per-stock failures only drop that stock.
    async fn fetch_history(&self, codes: Vec<String>, start: NaiveDate, end: NaiveDate) -> Result<History> {
        let mut fetches = std::pin::pin!(
            futures::stream::iter(codes)
                .map(|code| {
                    let provider = self.ctx.provider.clone();
                    async move {
                        let days = provider.daily_statistics(&code, start, end).await;
                        (code, days)
                    }
                })
                .buffer_unordered(self.ctx.producers.max(1))
        );

        let mut history = History::new();
        while let Some((code, days)) = fetches.next().await {
            match days {
                Ok(days) => {
                    history.insert(code, days);
                }
                Err(e @ StockerError::Transport(_)) => return Err(e),
                Err(e) => tracing::warn!("⚠️ History for {code} unavailable: {e}"),
            }
        }
        Ok(history)
    }
}

async fn write_snapshot(path: &Path, history: &History) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let json = serde_json::to_vec_pretty(history)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

#[async_trait]
impl ExclusiveTask for HistoryCrawler {
    async fn run_exclusive(&self) -> Result<RunOutcome> {
        let now = self.ctx.clock.now();
        let end = now.date_naive();
        let start = end
            .checked_sub_months(Months::new(self.ctx.history.years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN);

        let stocks = self.ctx.provider.realtime_stocks().await?;
        if stocks.is_empty() {
            tracing::warn!("⚠️ Stock list empty, history backfill postponed");
            return Ok(RunOutcome::Skipped);
        }
        let mut codes: Vec<String> = stocks
            .into_iter()
            .map(|s| s.code)
            .filter(|code| !code.is_empty())
            .collect();
        codes.sort();
        codes.dedup();
        tracing::info!("📜 History backfill {start} → {end} for {} stocks", codes.len());

        let history = self.fetch_history(codes, start, end).await?;

        if history.values().all(Vec::is_empty) {
            tracing::warn!("⚠️ No history returned for any stock, backfill postponed");
            return Ok(RunOutcome::Skipped);
        }

        let client = self.ctx.hbase.create();
        let table = &self.ctx.tables.daily;
        let offset = *now.offset();
        let mut stored = 0;
        for days in history.values().filter(|days| !days.is_empty()) {
            let rows: Vec<Row> = days
                .iter()
                .map(|stat| daily_row(stat, &day_start(stat.date, offset)))
                .collect();
            client.add(table, &rows).await?;
            stored += rows.len();
        }
        tracing::info!("📜 Stored {stored} historical days for {} stocks → '{table}'", history.len());

        if let Some(path) = &self.ctx.history.snapshot_path {
            write_snapshot(Path::new(path), &history).await?;
            tracing::info!("💾 History snapshot written to {path}");
        }
        Ok(RunOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use stocker_hbase::codec;
    use stocker_scheduler::{CompletionLedger, CrawlerTask, Exclusive, TaskRegistry, TaskScheduler};

    use crate::calendar::at;
    use crate::models::StockRealtimeInfo;
    use crate::testing::{FakeProvider, Reply, StubServer, context_for, day, quote};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_backfill_stores_days_and_snapshot() {
        let now = at(2024, 5, 6, 9, 0);
        let mut daily = HashMap::new();
        daily.insert(
            "sh600000".to_string(),
            vec![
                day("sh600000", date(2023, 4, 28), 9.0),
                day("sh600000", date(2023, 11, 1), 9.5),
                day("sh600000", date(2024, 5, 6), 10.5),
            ],
        );
        let provider = Arc::new(FakeProvider {
            realtime: vec![quote("sh600000", "浦发银行", 10.5), quote("sz000001", "平安银行", 11.0)],
            daily,
            ..Default::default()
        });
        let gateway = StubServer::start(|_| Reply::status(200)).await;
        let snapshot = std::env::temp_dir().join(format!("stocker-history-{}.json", rand::random::<u32>()));
        let mut ctx = context_for(provider.clone(), gateway.base_url(), now);
        ctx.history.snapshot_path = Some(snapshot.to_string_lossy().into_owned());

        let job = HistoryCrawler::new(ctx).unwrap();
        assert_eq!(job.run_exclusive().await.unwrap(), RunOutcome::Completed);

        // One year back from the run date.
        for (_, start, end) in provider.daily_calls.lock().unwrap().iter() {
            assert_eq!((*start, *end), (date(2023, 5, 6), date(2024, 5, 6)));
        }

        let writes = gateway.requests_to("PUT", "/StockInfoOfDay/row_key");
        assert_eq!(writes.len(), 1);
        let rows = codec::decode_rows(&writes[0].body).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.key == "sh600000"));
        let offset = *now.offset();
        assert_eq!(
            rows[0].cells.latest("close", "close").unwrap().timestamp,
            day_start(date(2023, 11, 1), offset).timestamp_millis()
        );
        assert_eq!(rows[1].latest_str("date", "date"), Some("2024-5-6 00:00:00"));

        let saved: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&snapshot).unwrap()).unwrap();
        assert_eq!(saved["sh600000"].as_array().unwrap().len(), 2);
        assert_eq!(saved["sz000001"].as_array().unwrap().len(), 0);
        std::fs::remove_file(&snapshot).ok();
    }

    fn two_stocks() -> Vec<StockRealtimeInfo> {
        vec![quote("sh600000", "浦发银行", 10.5), quote("sz000001", "平安银行", 11.0)]
    }

    #[tokio::test]
    async fn test_unreachable_upstream_fails_run() {
        let provider = Arc::new(FakeProvider {
            realtime: two_stocks(),
            daily_down: true,
            ..Default::default()
        });
        let gateway = StubServer::start(|_| Reply::status(200)).await;
        let ctx = context_for(provider, gateway.base_url(), at(2024, 5, 6, 9, 0));

        let job = HistoryCrawler::new(ctx).unwrap();
        assert!(matches!(job.run_exclusive().await, Err(StockerError::Transport(_))));
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_fetched_postpones() {
        let provider = Arc::new(FakeProvider {
            realtime: two_stocks(),
            ..Default::default()
        });
        let gateway = StubServer::start(|_| Reply::status(200)).await;
        let ctx = context_for(provider, gateway.base_url(), at(2024, 5, 6, 9, 0));

        let job = HistoryCrawler::new(ctx).unwrap();
        assert_eq!(job.run_exclusive().await.unwrap(), RunOutcome::Skipped);
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_backfill_stays_scheduled() {
        let provider = Arc::new(FakeProvider {
            realtime: two_stocks(),
            daily_down: true,
            ..Default::default()
        });
        let gateway = StubServer::start(|_| Reply::status(200)).await;
        let ctx = context_for(provider.clone(), gateway.base_url(), at(2024, 5, 6, 9, 0));
        let ledger_path = std::env::temp_dir().join(format!("stocker-history-ledger-{}.json", rand::random::<u32>()));

        let mut registry = TaskRegistry::new();
        registry
            .register(NAME, INTERVAL, true, move || {
                let job = HistoryCrawler::new(ctx.clone())?;
                Ok(Arc::new(Exclusive::new(NAME, job)) as Arc<dyn CrawlerTask>)
            })
            .unwrap();

        let mut scheduler = TaskScheduler::new(
            &registry,
            Duration::from_millis(50),
            CompletionLedger::open(&ledger_path),
        );
        scheduler.run_for(3).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Retried on later ticks, never recorded as done.
        assert_eq!(scheduler.len(), 1);
        assert!(provider.daily_calls.lock().unwrap().len() >= 4);
        assert!(!CompletionLedger::open(&ledger_path).is_completed(NAME));
        assert!(!ledger_path.exists());
    }

    #[tokio::test]
    async fn test_empty_list_postpones() {
        let gateway = StubServer::start(|_| Reply::status(200)).await;
        let ctx = context_for(Arc::new(FakeProvider::default()), gateway.base_url(), at(2024, 5, 6, 9, 0));
        let job = HistoryCrawler::new(ctx).unwrap();
        assert_eq!(job.run_exclusive().await.unwrap(), RunOutcome::Skipped);
        assert!(gateway.requests().is_empty());
    }
}
