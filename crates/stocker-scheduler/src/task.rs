//! Job contract, exclusive-run wrapper and the static job registry.

use std::sync::Arc;

use async_trait::async_trait;

use stocker_core::error::{Result, StockerError};

use crate::guard::ExclusiveGuard;

/// What a single launch of a job amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The job ran to completion.
    Completed,
    /// The job declined to run (already running, outside its window, ...).
    Skipped,
}

/// A periodic crawler job. The scheduler launches `run` on its own task
/// and never awaits it from the control loop.
#[async_trait]
pub trait CrawlerTask: Send + Sync {
    async fn run(&self) -> Result<RunOutcome>;
}

/// Job body for use with [`Exclusive`].
#[async_trait]
pub trait ExclusiveTask: Send + Sync {
    async fn run_exclusive(&self) -> Result<RunOutcome>;
}

/// Wraps a job so that overlapping launches are skipped instead of piling up.
pub struct Exclusive<T> {
    name: String,
    inner: T,
    guard: ExclusiveGuard,
}

impl<T> Exclusive<T> {
    pub fn new(name: impl Into<String>, inner: T) -> Self {
        Self {
            name: name.into(),
            inner,
            guard: ExclusiveGuard::new(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }
}

#[async_trait]
impl<T: ExclusiveTask> CrawlerTask for Exclusive<T> {
    async fn run(&self) -> Result<RunOutcome> {
        let Some(_region) = self.guard.try_enter() else {
            tracing::info!("⏭️ Job '{}' still running, skipping this launch", self.name);
            return Ok(RunOutcome::Skipped);
        };
        self.inner.run_exclusive().await
    }
}

/// Constructor for a job instance; called lazily on first launch.
pub type TaskFactory = Arc<dyn Fn() -> Result<Arc<dyn CrawlerTask>> + Send + Sync>;

/// Registration record for one job.
#[derive(Clone)]
pub struct TaskMetadata {
    pub name: String,
    /// Ticks between launches. Always > 0.
    pub interval: u64,
    /// Run once successfully, then never again (tracked by the completion ledger).
    pub run_once: bool,
    pub factory: TaskFactory,
}

impl std::fmt::Debug for TaskMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskMetadata")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("run_once", &self.run_once)
            .finish_non_exhaustive()
    }
}

/// Explicit name → job table, filled at startup.
#[derive(Debug, Default, Clone)]
pub struct TaskRegistry {
    tasks: Vec<TaskMetadata>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. Names must be unique and intervals positive.
    pub fn register<F>(&mut self, name: &str, interval: u64, run_once: bool, factory: F) -> Result<()>
    where
        F: Fn() -> Result<Arc<dyn CrawlerTask>> + Send + Sync + 'static,
    {
        if interval == 0 {
            return Err(StockerError::InvalidArgument(format!(
                "job '{name}' must have an interval of at least one tick"
            )));
        }
        if self.tasks.iter().any(|t| t.name == name) {
            return Err(StockerError::InvalidArgument(format!(
                "job '{name}' is already registered"
            )));
        }
        tracing::debug!("📅 Job registered: '{name}' every {interval} tick(s){}", if run_once { " (once)" } else { "" });
        self.tasks.push(TaskMetadata {
            name: name.to_string(),
            interval,
            run_once,
            factory: Arc::new(factory),
        });
        Ok(())
    }

    pub fn list(&self) -> &[TaskMetadata] {
        &self.tasks
    }

    pub fn get(&self, name: &str) -> Option<&TaskMetadata> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
