//! Realtime quote snapshots.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use stocker_core::error::Result;
use stocker_hbase::{Column, Row};
use stocker_scheduler::{ExclusiveTask, RunOutcome};

use super::{CrawlerContext, require_table};
use crate::calendar::{format_run_time, is_trading_day};
use crate::models::StockRealtimeInfo;

pub const NAME: &str = "realtime";
pub const INTERVAL: u64 = 3;

/// Stores the current price of every listed stock, stamped with the run time.
pub struct RealtimeCrawler {
    ctx: CrawlerContext,
}

impl RealtimeCrawler {
    pub fn new(ctx: CrawlerContext) -> Result<Self> {
        require_table(NAME, &ctx.tables.realtime)?;
        Ok(Self { ctx })
    }
}

fn quote_row(info: &StockRealtimeInfo, at: &DateTime<FixedOffset>) -> Row {
    let ts = at.timestamp_millis();
    let mut row = Row::new(info.code.clone());
    row.put(Column::new("name", "name"), ts, info.name.clone())
        .put(Column::new("price", "price"), ts, info.current_price.to_string())
        .put(Column::new("date", "date"), ts, format_run_time(at));
    row
}

#[async_trait]
impl ExclusiveTask for RealtimeCrawler {
    async fn run_exclusive(&self) -> Result<RunOutcome> {
        let now = self.ctx.clock.now();
        if !is_trading_day(now.date_naive()) {
            tracing::debug!("Market closed on {}, no realtime snapshot", now.date_naive());
            return Ok(RunOutcome::Skipped);
        }

        let stocks = self.ctx.provider.realtime_stocks().await?;
        let rows: Vec<Row> = stocks
            .iter()
            .filter(|s| !s.code.is_empty())
            .map(|s| quote_row(s, &now))
            .collect();
        if rows.is_empty() {
            tracing::warn!("⚠️ Realtime list came back empty, nothing stored");
            return Ok(RunOutcome::Skipped);
        }

        let table = &self.ctx.tables.realtime;
        self.ctx.hbase.create().add(table, &rows).await?;
        tracing::info!("📈 Stored {} realtime quotes → '{table}'", rows.len());
        Ok(RunOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stocker_hbase::codec;
    use stocker_scheduler::{CrawlerTask, Exclusive};

    use crate::calendar::at;
    use crate::testing::{FakeProvider, Reply, StubServer, context_for, quote};

    fn provider() -> Arc<FakeProvider> {
        Arc::new(FakeProvider {
            realtime: vec![quote("sh600000", "浦发银行", 10.52), quote("sz000001", "平安银行", 11.0)],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_weekday_run_stores_quotes() {
        let gateway = StubServer::start(|_| Reply::status(200)).await;
        let now = at(2024, 5, 6, 10, 3);
        let job = Exclusive::new(NAME, RealtimeCrawler::new(context_for(provider(), gateway.base_url(), now)).unwrap());

        assert_eq!(job.run().await.unwrap(), RunOutcome::Completed);

        let writes = gateway.requests_to("PUT", "/stocks/row_key");
        assert_eq!(writes.len(), 1);
        let rows = codec::decode_rows(&writes[0].body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "sh600000");
        assert_eq!(rows[0].latest_str("name", "name"), Some("浦发银行"));
        assert_eq!(rows[0].latest_str("price", "price"), Some("10.52"));
        assert_eq!(rows[0].latest_str("date", "date"), Some("2024-5-6 10:03:00"));
        assert_eq!(rows[1].latest_str("price", "price"), Some("11"));
        let ts = rows[0].cells.latest("price", "price").unwrap().timestamp;
        assert_eq!(ts, now.timestamp_millis());
    }

    #[tokio::test]
    async fn test_weekend_is_skipped() {
        let gateway = StubServer::start(|_| Reply::status(200)).await;
        // 2024-05-11 is a Saturday.
        let job = RealtimeCrawler::new(context_for(provider(), gateway.base_url(), at(2024, 5, 11, 10, 0))).unwrap();
        assert_eq!(job.run_exclusive().await.unwrap(), RunOutcome::Skipped);
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_empty_list_stores_nothing() {
        let gateway = StubServer::start(|_| Reply::status(200)).await;
        let ctx = context_for(Arc::new(FakeProvider::default()), gateway.base_url(), at(2024, 5, 6, 10, 0));
        let job = RealtimeCrawler::new(ctx).unwrap();
        assert_eq!(job.run_exclusive().await.unwrap(), RunOutcome::Skipped);
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_surfaces() {
        let gateway = StubServer::start(|_| Reply::status(503)).await;
        let job = RealtimeCrawler::new(context_for(provider(), gateway.base_url(), at(2024, 5, 6, 10, 0))).unwrap();
        assert!(job.run_exclusive().await.is_err());
    }
}
