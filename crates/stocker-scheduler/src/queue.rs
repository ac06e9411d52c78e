//! Bounded async FIFO used to hand work from producers to consumers.
//!
//! Two counting semaphores track free slots and queued items, so producers
//! wait while the queue is full and consumers wait while it is empty.
//! Closing the queue closes both semaphores, which wakes every waiter.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Semaphore;

use stocker_core::error::{Result, StockerError};

pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    free_slots: Semaphore,
    queued: Semaphore,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue that holds at most `capacity` items.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StockerError::InvalidArgument(
                "queue capacity must be positive".into(),
            ));
        }
        Ok(Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            free_slots: Semaphore::new(capacity),
            queued: Semaphore::new(0),
            capacity,
        })
    }

    /// Append `item`, waiting for a free slot if the queue is full.
    pub async fn enqueue(&self, item: T) -> Result<()> {
        let slot = self
            .free_slots
            .acquire()
            .await
            .map_err(|_| StockerError::QueueClosed)?;
        slot.forget();
        self.lock().push_back(item);
        self.queued.add_permits(1);
        Ok(())
    }

    /// Remove the oldest item, waiting while the queue is empty.
    pub async fn dequeue(&self) -> Result<T> {
        let ticket = self
            .queued
            .acquire()
            .await
            .map_err(|_| StockerError::QueueClosed)?;
        ticket.forget();
        let item = self.lock().pop_front().ok_or(StockerError::QueueClosed)?;
        self.free_slots.add_permits(1);
        Ok(item)
    }

    /// Tear the queue down. Pending and future calls fail with `QueueClosed`.
    pub fn close(&self) {
        self.free_slots.close();
        self.queued.close();
    }

    pub fn is_closed(&self) -> bool {
        self.queued.is_closed()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
