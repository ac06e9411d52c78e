//! Scheduler engine: a min-heap of jobs keyed by their next launch tick.
//!
//! ```text
//! ┌─ control task ──────────────────────────────────────────────┐
//! │ peek earliest ─► sleep until its tick ─► pop all due entries │
//! │   for each: activate (lazy, cached) ─► spawn run ─► re-push  │
//! └──────────────────────────────────────────────────────────────┘
//!        │ spawn (fire-and-forget)
//!        ▼
//!   supervisor ─► job task ─► outcome / error / panic logged here
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::ledger::CompletionLedger;
use crate::task::{CrawlerTask, RunOutcome, TaskMetadata, TaskRegistry};

/// Default tick length used in production.
pub const DEFAULT_TICK: Duration = Duration::from_secs(60);

struct ScheduleEntry {
    next_run: u64,
    seq: usize,
    meta: TaskMetadata,
    instance: Option<Arc<dyn CrawlerTask>>,
}

impl ScheduleEntry {
    fn activate(&mut self) -> Option<Arc<dyn CrawlerTask>> {
        if let Some(instance) = &self.instance {
            return Some(instance.clone());
        }
        match (self.meta.factory)() {
            Ok(instance) => {
                tracing::info!("🧩 Job '{}' activated", self.meta.name);
                self.instance = Some(instance.clone());
                Some(instance)
            }
            Err(e) => {
                tracing::error!(
                    "❌ Job '{}' could not be activated, retrying at tick {}: {e}",
                    self.meta.name,
                    self.next_run + self.meta.interval
                );
                None
            }
        }
    }
}

// Reversed so the max-heap yields the smallest (next_run, seq) first.
impl Ord for ScheduleEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .next_run
            .cmp(&self.next_run)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.next_run == other.next_run && self.seq == other.seq
    }
}

impl Eq for ScheduleEntry {}

/// Drives registered jobs on a fixed tick.
pub struct TaskScheduler {
    tick: Duration,
    entries: BinaryHeap<ScheduleEntry>,
    ledger: Arc<Mutex<CompletionLedger>>,
}

impl TaskScheduler {
    /// Build a scheduler from `registry`. Every job is first due at tick 0.
    pub fn new(registry: &TaskRegistry, tick: Duration, ledger: CompletionLedger) -> Self {
        let entries = registry
            .list()
            .iter()
            .enumerate()
            .map(|(seq, meta)| ScheduleEntry {
                next_run: 0,
                seq,
                meta: meta.clone(),
                instance: None,
            })
            .collect();
        Self {
            tick,
            entries,
            ledger: Arc::new(Mutex::new(ledger)),
        }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Number of jobs still scheduled.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run until there is nothing left to schedule (normally forever).
    pub async fn run(&mut self) {
        self.drive(None).await;
    }

    /// Run every launch due at ticks `0..=last_tick`, then return.
    /// Launched jobs keep running in the background.
    pub async fn run_for(&mut self, last_tick: u64) {
        self.drive(Some(last_tick)).await;
    }

    async fn drive(&mut self, limit: Option<u64>) {
        if self.entries.is_empty() {
            tracing::warn!("⚠️ No jobs registered, scheduler has nothing to do");
            return;
        }
        tracing::info!(
            "⏰ Scheduler started: {} job(s), tick {:?}",
            self.entries.len(),
            self.tick
        );

        let start = Instant::now();
        while let Some(due) = self.entries.peek().map(|e| e.next_run) {
            if limit.is_some_and(|last| due > last) {
                break;
            }
            tokio::time::sleep_until(start + self.offset(due)).await;

            while self.entries.peek().is_some_and(|e| e.next_run == due) {
                let Some(mut entry) = self.entries.pop() else {
                    break;
                };
                if entry.meta.run_once && self.is_completed(&entry.meta.name) {
                    tracing::info!("✅ Run-once job '{}' already completed, unscheduled", entry.meta.name);
                    continue;
                }
                if let Some(instance) = entry.activate() {
                    self.launch(&entry.meta, instance, due);
                }
                entry.next_run = due.saturating_add(entry.meta.interval);
                self.entries.push(entry);
            }
        }

        if self.entries.is_empty() {
            tracing::info!("🏁 All jobs finished, scheduler stopping");
        }
    }

    fn offset(&self, tick: u64) -> Duration {
        self.tick
            .saturating_mul(u32::try_from(tick).unwrap_or(u32::MAX))
    }

    fn is_completed(&self, name: &str) -> bool {
        self.ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_completed(name)
    }

    /// Spawn the job behind a supervisor so errors and panics stop here.
    fn launch(&self, meta: &TaskMetadata, instance: Arc<dyn CrawlerTask>, tick: u64) {
        let name = meta.name.clone();
        let run_once = meta.run_once;
        let ledger = self.ledger.clone();
        tracing::debug!("🚀 Launching '{name}' at tick {tick}");

        tokio::spawn(async move {
            let job = tokio::spawn(async move { instance.run().await });
            match job.await {
                Ok(Ok(RunOutcome::Completed)) => {
                    tracing::debug!("✅ Job '{name}' completed");
                    if run_once {
                        let mut ledger = ledger
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        if let Err(e) = ledger.mark_completed(&name) {
                            tracing::warn!("⚠️ Failed to record completion of '{name}': {e}");
                        }
                    }
                }
                Ok(Ok(RunOutcome::Skipped)) => {
                    tracing::debug!("⏭️ Job '{name}' skipped");
                }
                Ok(Err(e)) => {
                    tracing::error!("❌ Job '{name}' failed: {e}");
                }
                Err(e) if e.is_panic() => {
                    tracing::error!("💥 Job '{name}' panicked");
                }
                Err(e) => {
                    tracing::warn!("⚠️ Job '{name}' was cancelled: {e}");
                }
            }
        });
    }
}
