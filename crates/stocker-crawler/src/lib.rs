//! # Stocker Crawler
//!
//! Market-data jobs that feed the HBase tables:
//! - `realtime`: quote snapshots every few minutes while the market is open
//! - `daily`: end-of-day statistics, then a nudge to the prediction node
//! - `history`: a one-off backfill of past daily statistics
//!
//! Jobs read from a [`provider::StockInfoProvider`] and write through
//! [`stocker_hbase::HBaseClient`]; [`tasks::builtin_registry`] hands them to the
//! scheduler.

pub mod calendar;
pub mod models;
pub mod notifier;
pub mod provider;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use calendar::{Clock, FixedClock, SystemClock, in_daily_window, is_trading_day};
pub use models::{StockDailyStatisticsInfo, StockRealtimeInfo};
pub use notifier::{HttpPredictorNotifier, NoopPredictorNotifier, PredictorNotifier};
pub use provider::{ShenjianProvider, StockInfoProvider};
pub use tasks::{CrawlerContext, builtin_registry};
