//! Stocker configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StockerError};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockerConfig {
    #[serde(default)]
    pub hbase: HBaseConfig,
    #[serde(default)]
    pub shenjian: ShenjianConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl StockerConfig {
    /// Load config from the default path (~/.stocker/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StockerError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse config from a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| StockerError::Config(format!("Failed to parse config: {e}")))
    }

    /// Save config to the given path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| StockerError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Stocker home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stocker")
    }

    /// Reject values the crawler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.hbase.host.trim().is_empty() {
            return Err(StockerError::Config("hbase.host must not be empty".into()));
        }
        if self.hbase.port == 0 {
            return Err(StockerError::Config("hbase.port must not be 0".into()));
        }
        if self.shenjian.max_concurrent == 0 {
            return Err(StockerError::Config(
                "shenjian.max_concurrent must be at least 1".into(),
            ));
        }
        if self.scheduler.tick_secs == 0 {
            return Err(StockerError::Config(
                "scheduler.tick_secs must be at least 1".into(),
            ));
        }
        if self.scheduler.queue_capacity == 0 {
            return Err(StockerError::Config(
                "scheduler.queue_capacity must be at least 1".into(),
            ));
        }
        if self.shenjian.resolved_stock_list_app_id().is_none()
            || self.shenjian.resolved_stock_daily_stat_app_id().is_none()
        {
            return Err(StockerError::Config(
                "shenjian app ids are not configured (set them in [shenjian] or via SHENJIAN_STOCK_LIST_APPID / SHENJIAN_STOCK_DAILY_STAT_APPID)".into(),
            ));
        }
        Ok(())
    }
}

/// HBase REST gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HBaseConfig {
    #[serde(default = "default_hbase_host")]
    pub host: String,
    #[serde(default = "default_hbase_port")]
    pub port: u16,
    #[serde(default = "default_hbase_timeout")]
    pub timeout_secs: u64,
}

fn default_hbase_host() -> String { "localhost".into() }
fn default_hbase_port() -> u16 { 8080 }
fn default_hbase_timeout() -> u64 { 30 }

impl Default for HBaseConfig {
    fn default() -> Self {
        Self {
            host: default_hbase_host(),
            port: default_hbase_port(),
            timeout_secs: default_hbase_timeout(),
        }
    }
}

impl HBaseConfig {
    /// Base URL of the gateway.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Upstream market data API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShenjianConfig {
    #[serde(default = "default_shenjian_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub stock_list_app_id: String,
    #[serde(default)]
    pub stock_daily_stat_app_id: String,
    /// Upper bound on concurrent upstream calls.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Minimum spacing between two upstream call dispatches.
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,
    #[serde(default = "default_shenjian_timeout")]
    pub timeout_secs: u64,
}

fn default_shenjian_base_url() -> String { "https://api.shenjian.io/".into() }
fn default_max_concurrent() -> usize { 4 }
fn default_min_spacing_ms() -> u64 { 200 }
fn default_shenjian_timeout() -> u64 { 15 }

impl Default for ShenjianConfig {
    fn default() -> Self {
        Self {
            base_url: default_shenjian_base_url(),
            stock_list_app_id: String::new(),
            stock_daily_stat_app_id: String::new(),
            max_concurrent: default_max_concurrent(),
            min_spacing_ms: default_min_spacing_ms(),
            timeout_secs: default_shenjian_timeout(),
        }
    }
}

impl ShenjianConfig {
    /// Stock list app id: config value > `SHENJIAN_STOCK_LIST_APPID` > none.
    pub fn resolved_stock_list_app_id(&self) -> Option<String> {
        resolve_secret(&self.stock_list_app_id, "SHENJIAN_STOCK_LIST_APPID")
    }

    /// Daily statistics app id: config value > `SHENJIAN_STOCK_DAILY_STAT_APPID` > none.
    pub fn resolved_stock_daily_stat_app_id(&self) -> Option<String> {
        resolve_secret(
            &self.stock_daily_stat_app_id,
            "SHENJIAN_STOCK_DAILY_STAT_APPID",
        )
    }
}

fn resolve_secret(configured: &str, env_key: &str) -> Option<String> {
    if !configured.is_empty() {
        return Some(configured.to_string());
    }
    std::env::var(env_key).ok().filter(|v| !v.is_empty())
}

/// Predictor node notified after daily statistics land.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictorConfig {
    #[serde(default)]
    pub host: Option<String>,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Length of one scheduler tick. Job intervals are expressed in ticks.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Where completed run-once jobs are recorded. `None` keeps the record in memory.
    #[serde(default)]
    pub ledger_path: Option<String>,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_tick_secs() -> u64 { 60 }
fn default_queue_capacity() -> usize { 64 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            ledger_path: None,
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// HBase table names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_realtime_table")]
    pub realtime: String,
    #[serde(default = "default_daily_table")]
    pub daily: String,
}

fn default_realtime_table() -> String { "stocks".into() }
fn default_daily_table() -> String { "StockInfoOfDay".into() }

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            realtime: default_realtime_table(),
            daily: default_daily_table(),
        }
    }
}

/// One-off history backfill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_years")]
    pub years: u32,
    /// Optional JSON dump of the fetched history.
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

fn default_history_years() -> u32 { 1 }

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            years: default_history_years(),
            snapshot_path: None,
        }
    }
}
