//! Priority queue over a store sorted set.

use super::{Discipline, QueueConfig, WorkQueue, decode, record_op, record_pop};
use crate::codec::Codec;
use crate::error::Result;
use crate::model::WorkItem;
use crate::store::Store;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Floor for the wait between pop attempts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Highest `priority` first.
///
/// Items are stored with score `-priority`, so the most urgent item has the
/// lowest score. Items of equal priority come out in the order of their
/// encoded bytes, which is the store's tie-break and not insertion order.
/// Pushing an item whose encoding is already queued does not add a second
/// copy; it only updates the score.
pub struct PriorityQueue {
    store: Arc<dyn Store>,
    key: String,
    codec: Arc<dyn Codec>,
    poll_interval: Duration,
}

impl PriorityQueue {
    pub fn new(store: Arc<dyn Store>, key: impl Into<String>, codec: Arc<dyn Codec>) -> Self {
        Self {
            store,
            key: key.into(),
            codec,
            poll_interval: QueueConfig::default().poll_interval,
        }
    }

    /// Interval between pop attempts while waiting on an empty queue.
    /// Raised to [`MIN_POLL_INTERVAL`] when shorter.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }
}

#[async_trait]
impl WorkQueue for PriorityQueue {
    async fn len(&self) -> Result<usize> {
        self.store.zset_len(&self.key).await
    }

    async fn push(&self, item: &WorkItem) -> Result<()> {
        let data = self.codec.dumps(item)?;
        let score = -f64::from(item.priority);
        self.store.zset_add(&self.key, score, data).await?;
        record_op(&self.key, Discipline::Priority, "push");
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<WorkItem>> {
        let started = Instant::now();
        // None: no representable deadline, poll until an item shows up.
        let deadline = tokio::time::Instant::now().checked_add(timeout);
        let data = loop {
            if let Some(data) = self.store.zset_pop_min(&self.key).await? {
                break Some(data);
            }
            let mut wait = self.poll_interval;
            if let Some(deadline) = deadline {
                let now = tokio::time::Instant::now();
                if now >= deadline {
                    break None;
                }
                wait = wait.min(deadline - now);
            }
            trace!(key = %self.key, "priority queue empty, polling");
            tokio::time::sleep(wait).await;
        };
        record_pop(&self.key, Discipline::Priority, data.is_some(), started);
        decode(self.codec.as_ref(), data)
    }

    async fn clear(&self) -> Result<()> {
        self.store.delete(&self.key).await?;
        record_op(&self.key, Discipline::Priority, "clear");
        Ok(())
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn discipline(&self) -> Discipline {
        Discipline::Priority
    }
}
