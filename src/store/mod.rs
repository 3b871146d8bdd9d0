//! Shared-store primitives.
//!
//! Every queue and filter operation is built from the calls on [`Store`].
//! Each call is either a single atomic store command or an explicit
//! transaction; callers never compose two calls into a read-modify-write.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Which end of a list a pop takes from.
///
/// Pushes always go to the head, so `Head` pops behave as a stack and
/// `Tail` pops as a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEnd {
    Head,
    Tail,
}

/// The data-structure store shared by every worker.
#[async_trait]
pub trait Store: Send + Sync {
    /// Push onto the head of the list at `key` (LPUSH).
    async fn list_push(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Pop from `end` of the list, `None` if it is empty (LPOP / RPOP).
    async fn list_pop(&self, key: &str, end: ListEnd) -> Result<Option<Vec<u8>>>;

    /// Pop from `end`, waiting up to `timeout` for an element (BLPOP / BRPOP).
    async fn list_pop_blocking(
        &self,
        key: &str,
        end: ListEnd,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>>;

    async fn list_len(&self, key: &str) -> Result<usize>;

    /// Add `member` with `score`, updating the score if already present (ZADD).
    async fn zset_add(&self, key: &str, score: f64, member: Vec<u8>) -> Result<()>;

    /// Remove and return the lowest-ranked member in one transaction.
    ///
    /// Rank is score ascending, then member bytes ascending.
    async fn zset_pop_min(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn zset_len(&self, key: &str) -> Result<usize>;

    /// Set every bit in `offsets` to 1 in one transaction (SETBIT).
    async fn set_bits(&self, key: &str, offsets: &[u64]) -> Result<()>;

    /// Read the bits at `offsets` in one round trip (GETBIT).
    async fn get_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>>;

    /// Delete `key` and whatever it holds (DEL).
    async fn delete(&self, key: &str) -> Result<()>;

    /// Liveness check.
    async fn ping(&self) -> Result<()>;
}
