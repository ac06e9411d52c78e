//! # Stocker Scheduler
//!
//! Tick-based job scheduler plus the concurrency primitives the crawler jobs
//! are built from.
//!
//! ```text
//! TaskRegistry (name → interval, run-once, constructor)
//!   └── TaskScheduler (min-heap on next tick)
//!         ├── realtime  every 3 ticks
//!         ├── daily     every 60 ticks
//!         └── history   once (CompletionLedger)
//!
//! Exclusive<T>   skip a launch while the previous one is still running
//! BoundedQueue   producer/consumer hand-off with back-pressure
//! RateLimiter    N in flight, fixed spacing between call starts
//! ```

pub mod engine;
pub mod guard;
pub mod ledger;
pub mod limiter;
pub mod queue;
pub mod task;

pub use engine::{DEFAULT_TICK, TaskScheduler};
pub use guard::{ExclusiveGuard, ExclusiveRegion};
pub use ledger::CompletionLedger;
pub use limiter::{RateLimiter, RatePermit};
pub use queue::BoundedQueue;
pub use task::{CrawlerTask, Exclusive, ExclusiveTask, RunOutcome, TaskFactory, TaskMetadata, TaskRegistry};
