//! The crawl frontier: a work queue guarded by a membership filter.
//!
//! Producers call [`Frontier::submit`], which skips items whose fingerprint
//! the filter has already seen. Consumers call [`Frontier::next`] and treat
//! `None` as "idle, poll again", or hand the loop to [`Frontier::consume`].

use crate::codec::{Codec, default_codec};
use crate::config::FrontierConfig;
use crate::error::Result;
use crate::filter::BloomFilter;
use crate::model::WorkItem;
use crate::queue::{WorkQueue, open_queue};
use crate::store::Store;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Pause after a failed pop before [`Frontier::consume`] tries again.
pub const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Outcome of submitting an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitResult {
    /// The item was pushed onto the queue.
    Queued,
    /// The filter had (probably) seen the item's fingerprint; nothing was
    /// pushed.
    Duplicate,
}

pub struct Frontier {
    queue: Box<dyn WorkQueue>,
    filter: BloomFilter,
}

impl Frontier {
    pub fn new(queue: Box<dyn WorkQueue>, filter: BloomFilter) -> Self {
        Self { queue, filter }
    }

    /// Open the queue and filter described by `config`, using the default
    /// codec.
    pub fn open(config: &FrontierConfig, store: Arc<dyn Store>) -> Result<Self> {
        Self::open_with_codec(config, store, default_codec())
    }

    pub fn open_with_codec(
        config: &FrontierConfig,
        store: Arc<dyn Store>,
        codec: Arc<dyn Codec>,
    ) -> Result<Self> {
        config.validate()?;
        let filter = BloomFilter::new(Arc::clone(&store), config.filter_key(), config.filter)?;
        let queue = open_queue(
            config.discipline,
            store,
            config.queue_key(),
            codec,
            &config.queue_config(),
        );
        Ok(Self { queue, filter })
    }

    pub fn queue(&self) -> &dyn WorkQueue {
        self.queue.as_ref()
    }

    pub fn filter(&self) -> &BloomFilter {
        &self.filter
    }

    /// Push `item` unless its fingerprint was seen before.
    ///
    /// Items with `dont_filter` set bypass the filter entirely. The
    /// exists/insert pair is not atomic: concurrent producers may both
    /// queue the same new URL.
    pub async fn submit(&self, item: &WorkItem) -> Result<SubmitResult> {
        if !item.dont_filter {
            let fingerprint = item.fingerprint();
            if self.filter.exists(&fingerprint).await? {
                debug!(url = %item.url, "duplicate, not queued");
                record_submit("duplicate");
                return Ok(SubmitResult::Duplicate);
            }
            self.filter.insert(&fingerprint).await?;
        }
        self.queue.push(item).await?;
        record_submit("queued");
        Ok(SubmitResult::Queued)
    }

    /// Whether `item`'s fingerprint has (probably) been seen.
    pub async fn seen(&self, item: &WorkItem) -> Result<bool> {
        self.filter.exists(&item.fingerprint()).await
    }

    /// Next item per the queue's discipline, waiting up to `timeout`.
    pub async fn next(&self, timeout: Duration) -> Result<Option<WorkItem>> {
        self.queue.pop(timeout).await
    }

    /// Pop items and pass them to `handle` until `stop` holds `true`.
    ///
    /// The flag is read between pops and never raced against one: a pop
    /// already sent to the store always hands its item over, so stopping
    /// takes up to one `timeout`. `None` pops are idle ticks; failed pops
    /// are logged and retried after [`RETRY_PAUSE`]. Returns the number of
    /// items handled.
    pub async fn consume<F>(
        &self,
        stop: &watch::Receiver<bool>,
        timeout: Duration,
        mut handle: F,
    ) -> u64
    where
        F: FnMut(WorkItem),
    {
        let mut handled = 0;
        while !*stop.borrow() {
            match self.next(timeout).await {
                Ok(Some(item)) => {
                    handle(item);
                    handled += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(queue = self.queue.key(), "pop failed: {e}");
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
            }
        }
        handled
    }

    pub async fn len(&self) -> Result<usize> {
        self.queue.len().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        self.queue.is_empty().await
    }

    /// Drop all pending work. The filter is left as is.
    pub async fn clear(&self) -> Result<()> {
        self.queue.clear().await
    }
}

fn record_submit(result: &'static str) {
    metrics::frontier_submitted().add(1, &[KeyValue::new("result", result)]);
}
