//! Shared work queues.
//!
//! Three interchangeable disciplines over one contract:
//!
//! | discipline | push            | pop                                 |
//! |------------|-----------------|-------------------------------------|
//! | FIFO       | list head       | list tail (BRPOP when waiting)      |
//! | LIFO       | list head       | list head (BLPOP when waiting)      |
//! | Priority   | sorted set, score = -priority | min-score member, in one transaction |
//!
//! Queues keep nothing in process memory: length and contents are read from
//! the store on every call. No operation retries internally.

pub mod fifo;
pub mod lifo;
pub mod priority;

pub use fifo::FifoQueue;
pub use lifo::LifoQueue;
pub use priority::PriorityQueue;

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::model::WorkItem;
use crate::store::Store;
use crate::telemetry::metrics;
use async_trait::async_trait;
use opentelemetry::KeyValue;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The contract every queue discipline implements.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Number of pending items.
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Encode `item` and insert it. Never blocks.
    async fn push(&self, item: &WorkItem) -> Result<()>;

    /// Remove and return the next item.
    ///
    /// A zero `timeout` returns at once; otherwise waits up to `timeout` for
    /// an item. `None` means nothing arrived in time. A payload that fails to
    /// decode is returned as an error; it has already left the queue.
    async fn pop(&self, timeout: Duration) -> Result<Option<WorkItem>>;

    /// Delete every pending item.
    async fn clear(&self) -> Result<()>;

    fn key(&self) -> &str;

    fn discipline(&self) -> Discipline;
}

/// Queue ordering discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    Fifo,
    Lifo,
    #[default]
    Priority,
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Discipline::Fifo => "fifo",
            Discipline::Lifo => "lifo",
            Discipline::Priority => "priority",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Discipline {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" | "queue" => Ok(Discipline::Fifo),
            "lifo" | "stack" => Ok(Discipline::Lifo),
            "priority" => Ok(Discipline::Priority),
            other => Err(Error::Config(format!("unknown queue discipline: {other}"))),
        }
    }
}

/// Tuning shared by all disciplines.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How often a waiting priority pop retries its transaction. The store
    /// has no blocking form of that transaction, so waiting is a poll.
    pub poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Open a queue of the given discipline at `key`.
pub fn open_queue(
    discipline: Discipline,
    store: Arc<dyn Store>,
    key: impl Into<String>,
    codec: Arc<dyn Codec>,
    config: &QueueConfig,
) -> Box<dyn WorkQueue> {
    match discipline {
        Discipline::Fifo => Box::new(FifoQueue::new(store, key, codec)),
        Discipline::Lifo => Box::new(LifoQueue::new(store, key, codec)),
        Discipline::Priority => Box::new(
            PriorityQueue::new(store, key, codec).poll_interval(config.poll_interval),
        ),
    }
}

// ---------------------------------------------------------------------------
// Instrumentation
// ---------------------------------------------------------------------------

pub(crate) fn record_op(key: &str, discipline: Discipline, operation: &'static str) {
    metrics::queue_operations().add(
        1,
        &[
            KeyValue::new("queue", key.to_string()),
            KeyValue::new("discipline", discipline.to_string()),
            KeyValue::new("operation", operation),
        ],
    );
}

pub(crate) fn record_pop(key: &str, discipline: Discipline, hit: bool, started: Instant) {
    record_op(key, discipline, if hit { "pop" } else { "pop_empty" });
    metrics::pop_wait_ms().record(
        started.elapsed().as_secs_f64() * 1000.0,
        &[KeyValue::new("discipline", discipline.to_string())],
    );
}

/// Decode an optional payload, keeping a decode failure as an error.
pub(crate) fn decode(codec: &dyn Codec, data: Option<Vec<u8>>) -> Result<Option<WorkItem>> {
    data.map(|bytes| codec.loads(&bytes)).transpose()
}
