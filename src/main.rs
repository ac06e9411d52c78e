//! # Stocker
//!
//! Runs the market-data jobs on a tick-based scheduler and stores what they
//! fetch in HBase.
//!
//! Usage:
//!   stocker                              # Use ~/.stocker/config.toml
//!   stocker --config ./stocker.toml      # Explicit config file
//!   stocker --list-tasks                 # Show registered jobs and exit
//!   stocker --tick-secs 5 --verbose      # Faster ticks, debug logs

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stocker_core::StockerConfig;
use stocker_crawler::{CrawlerContext, builtin_registry};
use stocker_scheduler::{CompletionLedger, TaskScheduler};

#[derive(Parser)]
#[command(
    name = "stocker",
    version,
    about = "📈 Stocker, market data crawler backed by HBase"
)]
struct Cli {
    /// Config file (defaults to ~/.stocker/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override scheduler.tick_secs
    #[arg(long)]
    tick_secs: Option<u64>,

    /// Print the registered jobs and exit
    #[arg(long)]
    list_tasks: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn load_config(cli: &Cli) -> Result<StockerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = expand_path(path);
            StockerConfig::load_from(Path::new(&path))
                .with_context(|| format!("loading config from {path}"))?
        }
        None => StockerConfig::load().context("loading default config")?,
    };
    if let Some(tick) = cli.tick_secs {
        config.scheduler.tick_secs = tick;
    }
    config.validate()?;
    Ok(config)
}

fn open_ledger(config: &StockerConfig) -> CompletionLedger {
    match &config.scheduler.ledger_path {
        Some(path) => CompletionLedger::open(expand_path(path)),
        None => CompletionLedger::in_memory(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "stocker=debug,stocker_crawler=debug,stocker_scheduler=debug,stocker_hbase=debug"
    } else {
        "stocker=info,stocker_crawler=info,stocker_scheduler=info,stocker_hbase=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = load_config(&cli)?;
    let ctx = CrawlerContext::from_config(&config)?;
    let registry = builtin_registry(&ctx)?;

    if cli.list_tasks {
        println!("📋 Registered jobs (tick = {}s)\n", config.scheduler.tick_secs);
        for meta in registry.list() {
            let mode = if meta.run_once { "once" } else { "repeat" };
            println!("   {:<10} every {:>3} tick(s)  [{mode}]", meta.name, meta.interval);
        }
        return Ok(());
    }

    println!("📈 Stocker v{}", env!("CARGO_PKG_VERSION"));
    println!("   🗄️  HBase:      {}", ctx.hbase.base_url());
    println!("   ⏱️  Tick:       {}s", config.scheduler.tick_secs);
    println!("   📋 Jobs:       {}", registry.len());
    println!(
        "   🔔 Predictor:  {}",
        config.predictor.host.as_deref().unwrap_or("(none)")
    );
    println!();

    let ledger = open_ledger(&config);
    let mut scheduler = TaskScheduler::new(
        &registry,
        Duration::from_secs(config.scheduler.tick_secs),
        ledger,
    );

    tokio::select! {
        _ = scheduler.run() => {
            tracing::warn!("⚠️ Scheduler stopped: no jobs left");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("👋 Shutting down");
        }
    }
    Ok(())
}
