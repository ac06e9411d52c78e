//! Rate limiter for upstream API calls: at most N calls in flight, and
//! consecutive call starts at least `min_spacing` apart.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

use stocker_core::error::{Result, StockerError};

#[derive(Debug)]
pub struct RateLimiter {
    in_flight: Semaphore,
    spacing: Mutex<()>,
    min_spacing: Duration,
    max_concurrent: usize,
}

/// Held for the duration of one call; frees a concurrency slot on drop.
#[derive(Debug)]
pub struct RatePermit<'a> {
    _slot: SemaphorePermit<'a>,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize, min_spacing: Duration) -> Result<Self> {
        if max_concurrent == 0 {
            return Err(StockerError::InvalidArgument(
                "rate limiter needs at least one concurrent slot".into(),
            ));
        }
        Ok(Self {
            in_flight: Semaphore::new(max_concurrent),
            spacing: Mutex::new(()),
            min_spacing,
            max_concurrent,
        })
    }

    /// Wait for a concurrency slot, then for the spacing turn.
    pub async fn acquire(&self) -> Result<RatePermit<'_>> {
        let slot = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| StockerError::Disposed("RateLimiter"))?;
        {
            let _turn = self.spacing.lock().await;
            tokio::time::sleep(self.min_spacing).await;
        }
        Ok(RatePermit { _slot: slot })
    }

    /// Run `call` under a permit.
    pub async fn run<F, Fut, T>(&self, call: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self.acquire().await?;
        call().await
    }

    /// Refuse further permits; waiters fail with a lifecycle error.
    pub fn close(&self) {
        self.in_flight.close();
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(RateLimiter::new(0, Duration::from_millis(10)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_and_concurrency_bound() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_millis(100)).unwrap());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let starts = Arc::new(std::sync::Mutex::new(Vec::new()));

        let calls: Vec<_> = (0..6)
            .map(|_| {
                let limiter = limiter.clone();
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                let starts = starts.clone();
                tokio::spawn(async move {
                    limiter
                        .run(move || async move {
                            starts.lock().unwrap().push(Instant::now());
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_secs(1)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, StockerError>(())
                        })
                        .await
                })
            })
            .collect();
        for call in calls {
            call.await.unwrap().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
        let mut starts = starts.lock().unwrap().clone();
        starts.sort();
        assert_eq!(starts.len(), 6);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
    }

    #[tokio::test]
    async fn test_closed_limiter_rejects() {
        let limiter = RateLimiter::new(1, Duration::ZERO).unwrap();
        limiter.close();
        let result = limiter.run(|| async { Ok::<_, StockerError>(()) }).await;
        assert!(matches!(result, Err(StockerError::Disposed(_))));
    }
}
