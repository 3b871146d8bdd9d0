//! Store-backed Bloom filter.

use super::{FilterConfig, HashFamily};
use crate::error::Result;
use crate::store::Store;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use std::sync::Arc;
use tracing::trace;

/// Bloom filter over a bit array at one key of the shared store.
///
/// `exists` followed by `insert` is not atomic: two workers can both see
/// `false` for the same value and both go on to enqueue it. The filter
/// bounds the duplicate rate under concurrency; it does not eliminate it.
pub struct BloomFilter {
    store: Arc<dyn Store>,
    key: String,
    config: FilterConfig,
    hashes: Vec<HashFamily>,
}

impl BloomFilter {
    /// Build a filter over `key`, with seeds `0..hash_number`.
    pub fn new(store: Arc<dyn Store>, key: impl Into<String>, config: FilterConfig) -> Result<Self> {
        config.validate()?;
        let m = config.size();
        let hashes = (0..u64::from(config.hash_number))
            .map(|seed| HashFamily::new(m, seed))
            .collect();
        Ok(Self {
            store,
            key: key.into(),
            config,
            hashes,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> FilterConfig {
        self.config
    }

    /// Bit offsets probed for `value`, one per hash function.
    pub fn offsets(&self, value: &str) -> Vec<u64> {
        self.hashes.iter().map(|h| h.hash(value)).collect()
    }

    /// Record `value` as seen. All of its bits are set in one transaction.
    pub async fn insert(&self, value: &str) -> Result<()> {
        let offsets = self.offsets(value);
        self.store.set_bits(&self.key, &offsets).await?;
        trace!(key = %self.key, ?offsets, "filter insert");
        metrics::filter_operations().add(
            1,
            &[
                KeyValue::new("filter", self.key.clone()),
                KeyValue::new("operation", "insert"),
            ],
        );
        Ok(())
    }

    /// `true` if `value` was probably inserted before, `false` if it
    /// definitely was not. Empty input is never present and never touches
    /// the store.
    pub async fn exists(&self, value: &str) -> Result<bool> {
        if value.is_empty() {
            return Ok(false);
        }
        let offsets = self.offsets(value);
        let bits = self.store.get_bits(&self.key, &offsets).await?;
        let exists = bits.iter().all(|&b| b);
        metrics::filter_operations().add(
            1,
            &[
                KeyValue::new("filter", self.key.clone()),
                KeyValue::new(
                    "operation",
                    if exists { "exists_hit" } else { "exists_miss" },
                ),
            ],
        );
        Ok(exists)
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("key", &self.key)
            .field("config", &self.config)
            .finish()
    }
}
