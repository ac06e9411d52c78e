//! Single-flight guard for periodic jobs.

use std::sync::atomic::{AtomicBool, Ordering};

/// Lets at most one holder inside a region at a time. Entering never blocks:
/// a caller that finds the region occupied gets `None` and moves on.
#[derive(Debug, Default)]
pub struct ExclusiveGuard {
    running: AtomicBool,
}

impl ExclusiveGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to enter. The returned region frees the guard when dropped,
    /// including during unwinding.
    pub fn try_enter(&self) -> Option<ExclusiveRegion<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExclusiveRegion { guard: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Proof of being inside an [`ExclusiveGuard`].
#[derive(Debug)]
pub struct ExclusiveRegion<'a> {
    guard: &'a ExclusiveGuard,
}

impl Drop for ExclusiveRegion<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}
