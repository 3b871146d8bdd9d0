//! First-in, first-out queue over a store list.

use super::{Discipline, WorkQueue, decode, record_op, record_pop};
use crate::codec::Codec;
use crate::error::Result;
use crate::model::WorkItem;
use crate::store::{ListEnd, Store};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Items come out in the order they went in: pushed at the head, popped
/// from the tail.
pub struct FifoQueue {
    store: Arc<dyn Store>,
    key: String,
    codec: Arc<dyn Codec>,
}

impl FifoQueue {
    pub fn new(store: Arc<dyn Store>, key: impl Into<String>, codec: Arc<dyn Codec>) -> Self {
        Self {
            store,
            key: key.into(),
            codec,
        }
    }
}

#[async_trait]
impl WorkQueue for FifoQueue {
    async fn len(&self) -> Result<usize> {
        self.store.list_len(&self.key).await
    }

    async fn push(&self, item: &WorkItem) -> Result<()> {
        let data = self.codec.dumps(item)?;
        self.store.list_push(&self.key, data).await?;
        record_op(&self.key, Discipline::Fifo, "push");
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<WorkItem>> {
        let started = Instant::now();
        let data = if timeout.is_zero() {
            self.store.list_pop(&self.key, ListEnd::Tail).await?
        } else {
            self.store
                .list_pop_blocking(&self.key, ListEnd::Tail, timeout)
                .await?
        };
        record_pop(&self.key, Discipline::Fifo, data.is_some(), started);
        decode(self.codec.as_ref(), data)
    }

    async fn clear(&self) -> Result<()> {
        self.store.delete(&self.key).await?;
        record_op(&self.key, Discipline::Fifo, "clear");
        Ok(())
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn discipline(&self) -> Discipline {
        Discipline::Fifo
    }
}
