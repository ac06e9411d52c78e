//! Crawler jobs and their registration.
//!
//! | job      | every    | when                        | writes to          |
//! |----------|----------|-----------------------------|--------------------|
//! | realtime | 3 ticks  | weekdays                    | `tables.realtime`  |
//! | daily    | 60 ticks | weekdays, 15:00 to 16:00    | `tables.daily`     |
//! | history  | once     | first tick, retried on miss | `tables.daily`     |

pub mod daily;
pub mod history;
pub mod realtime;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use stocker_core::StockerConfig;
use stocker_core::config::{HistoryConfig, TablesConfig};
use stocker_core::error::{Result, StockerError};
use stocker_hbase::{Column, HBaseClientFactory, Row};
use stocker_scheduler::{CrawlerTask, Exclusive, TaskRegistry};

use crate::calendar::{Clock, SystemClock, format_run_time};
use crate::models::StockDailyStatisticsInfo;
use crate::notifier::{self, PredictorNotifier};
use crate::provider::{ShenjianProvider, StockInfoProvider};

pub use daily::DailyStatCrawler;
pub use history::HistoryCrawler;
pub use realtime::RealtimeCrawler;

/// Everything a job needs, shared by all jobs.
#[derive(Clone)]
pub struct CrawlerContext {
    pub provider: Arc<dyn StockInfoProvider>,
    pub hbase: HBaseClientFactory,
    pub notifier: Arc<dyn PredictorNotifier>,
    pub clock: Arc<dyn Clock>,
    pub tables: TablesConfig,
    pub history: HistoryConfig,
    /// Parallel upstream fetches per job.
    pub producers: usize,
    /// Hand-off buffer between fetchers and the row builder.
    pub queue_capacity: usize,
}

impl CrawlerContext {
    /// Wire up the production context.
    pub fn from_config(config: &StockerConfig) -> Result<Self> {
        let provider = ShenjianProvider::from_config(&config.shenjian)?;
        let notifier = notifier::from_config(
            &config.predictor,
            Duration::from_secs(config.hbase.timeout_secs),
        )?;
        Ok(Self {
            provider: Arc::new(provider),
            hbase: HBaseClientFactory::from_config(&config.hbase)?,
            notifier,
            clock: Arc::new(SystemClock),
            tables: config.tables.clone(),
            history: config.history.clone(),
            producers: config.shenjian.max_concurrent,
            queue_capacity: config.scheduler.queue_capacity,
        })
    }
}

fn require_table(job: &str, table: &str) -> Result<()> {
    if table.trim().is_empty() {
        return Err(StockerError::Activation {
            name: job.to_string(),
            reason: "target table name is empty".into(),
        });
    }
    Ok(())
}

/// Register the built-in jobs, each wrapped so overlapping launches are skipped.
pub fn builtin_registry(ctx: &CrawlerContext) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();

    let c = ctx.clone();
    registry.register(realtime::NAME, realtime::INTERVAL, false, move || {
        let job = RealtimeCrawler::new(c.clone())?;
        Ok(Arc::new(Exclusive::new(realtime::NAME, job)) as Arc<dyn CrawlerTask>)
    })?;

    let c = ctx.clone();
    registry.register(daily::NAME, daily::INTERVAL, false, move || {
        let job = DailyStatCrawler::new(c.clone())?;
        Ok(Arc::new(Exclusive::new(daily::NAME, job)) as Arc<dyn CrawlerTask>)
    })?;

    let c = ctx.clone();
    registry.register(history::NAME, history::INTERVAL, true, move || {
        let job = HistoryCrawler::new(c.clone())?;
        Ok(Arc::new(Exclusive::new(history::NAME, job)) as Arc<dyn CrawlerTask>)
    })?;

    Ok(registry)
}

fn price(value: f64) -> String {
    value.to_string()
}

/// Row for one day of statistics, stamped at `at`.
pub(crate) fn daily_row(info: &StockDailyStatisticsInfo, at: &DateTime<FixedOffset>) -> Row {
    let ts = at.timestamp_millis();
    let mut row = Row::new(info.code.clone());
    row.put(Column::new("open", "open"), ts, price(info.open_price))
        .put(Column::new("close", "close"), ts, price(info.close_price))
        .put(Column::new("highest", "highest"), ts, price(info.highest_price))
        .put(Column::new("lowest", "lowest"), ts, price(info.lowest_price))
        .put(Column::new("total", "total"), ts, info.volume.to_string())
        .put(Column::new("date", "date"), ts, format_run_time(at));
    row
}
