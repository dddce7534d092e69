//! Bounded download slots shared by every acquisition

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Limits how many material downloads are in flight at once
///
/// Cloning is cheap and every clone shares the same slots, so a single pool
/// owned by the [`Pipeline`](crate::Pipeline) bounds downloads across all tasks
/// it runs.
#[derive(Clone, Debug)]
pub struct DownloadPool {
    slots: Arc<Semaphore>,
    limit: usize,
}

impl DownloadPool {
    /// Pool with `limit` slots (at least one)
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            slots: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Wait for a free slot; the slot is released when the permit is dropped
    ///
    /// Returns `None` only if the pool was closed.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.slots.clone().acquire_owned().await.ok()
    }

    /// Configured number of slots
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}
