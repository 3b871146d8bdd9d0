//! Redis-backed store.
//!
//! Uses a deadpool connection pool. Blocking pops hold a pooled connection
//! for their whole wait, so they never stall commands issued by other tasks.

use super::{ListEnd, Store};
use crate::error::{Error, Result};
use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use std::time::Duration;
use tracing::{debug, info};

/// Blocking-pop timeouts at or above this are sent as 0, which Redis reads
/// as "wait forever". Larger values are rejected by the server.
const BLOCK_FOREVER_AFTER: Duration = Duration::from_secs(u32::MAX as u64);

fn blocking_timeout_secs(timeout: Duration) -> f64 {
    if timeout >= BLOCK_FOREVER_AFTER {
        0.0
    } else {
        timeout.as_secs_f64()
    }
}

/// Store handle backed by a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Build a pool for `url` and verify it with a PING.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::Config(format!("invalid Redis configuration: {e}")))?;
        let store = Self { pool };
        store.ping().await?;
        info!("redis store connected");
        Ok(store)
    }

    async fn conn(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::Pool(format!("failed to get Redis connection: {e}")))
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("pool", &self.pool.status())
            .finish()
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn list_push(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: i64 = redis::cmd("LPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_pop(&self, key: &str, end: ListEnd) -> Result<Option<Vec<u8>>> {
        let command = match end {
            ListEnd::Head => "LPOP",
            ListEnd::Tail => "RPOP",
        };
        let mut conn = self.conn().await?;
        let value: Option<Vec<u8>> = redis::cmd(command).arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn list_pop_blocking(
        &self,
        key: &str,
        end: ListEnd,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>> {
        let command = match end {
            ListEnd::Head => "BLPOP",
            ListEnd::Tail => "BRPOP",
        };
        let mut conn = self.conn().await?;
        // Reply is (key, value), or nil once the timeout lapses.
        let reply: Option<(String, Vec<u8>)> = redis::cmd(command)
            .arg(key)
            .arg(blocking_timeout_secs(timeout))
            .query_async(&mut conn)
            .await?;
        if reply.is_none() {
            debug!(key, ?timeout, "blocking pop timed out");
        }
        Ok(reply.map(|(_, value)| value))
    }

    async fn list_len(&self, key: &str) -> Result<usize> {
        let mut conn = self.conn().await?;
        let len: usize = redis::cmd("LLEN").arg(key).query_async(&mut conn).await?;
        Ok(len)
    }

    async fn zset_add(&self, key: &str, score: f64, member: Vec<u8>) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: i64 = redis::cmd("ZADD")
            .arg(key)
            .arg(score)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn zset_pop_min(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;
        // MULTI/EXEC: no other client can pop the same head between the
        // range read and the removal.
        let (mut head, _removed): (Vec<Vec<u8>>, i64) = redis::pipe()
            .atomic()
            .cmd("ZRANGE")
            .arg(key)
            .arg(0)
            .arg(0)
            .cmd("ZREMRANGEBYRANK")
            .arg(key)
            .arg(0)
            .arg(0)
            .query_async(&mut conn)
            .await?;
        Ok(head.pop())
    }

    async fn zset_len(&self, key: &str) -> Result<usize> {
        let mut conn = self.conn().await?;
        let len: usize = redis::cmd("ZCARD").arg(key).query_async(&mut conn).await?;
        Ok(len)
    }

    async fn set_bits(&self, key: &str, offsets: &[u64]) -> Result<()> {
        if offsets.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for offset in offsets {
            pipe.cmd("SETBIT").arg(key).arg(*offset).arg(1).ignore();
        }
        let mut conn = self.conn().await?;
        let () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn get_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>> {
        if offsets.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        for offset in offsets {
            pipe.cmd("GETBIT").arg(key).arg(*offset);
        }
        let mut conn = self.conn().await?;
        let bits: Vec<u8> = pipe.query_async(&mut conn).await?;
        Ok(bits.into_iter().map(|b| b == 1).collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
