//! Membership filter for crawl dedup.
//!
//! A Bloom filter whose bit array lives in the shared store, so every worker
//! sees the same set. No false negatives; false positives grow with the
//! number of insertions. Entries are never removed.

pub mod bloom;
pub mod hash;

pub use bloom::BloomFilter;
pub use hash::HashFamily;

use crate::error::{Error, Result};
use serde::Deserialize;

/// Largest supported exponent: Redis bitmaps top out at 2^32 bits.
pub const MAX_BIT: u32 = 32;

pub const DEFAULT_BIT: u32 = 30;
pub const DEFAULT_HASH_NUMBER: u32 = 6;

/// Sizing of a Bloom filter: `m = 2^bit` bits probed by `hash_number` hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub bit: u32,
    pub hash_number: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            bit: DEFAULT_BIT,
            hash_number: DEFAULT_HASH_NUMBER,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bit == 0 || self.bit > MAX_BIT {
            return Err(Error::Config(format!(
                "filter bit exponent must be in 1..={MAX_BIT}, got {}",
                self.bit
            )));
        }
        if self.hash_number == 0 {
            return Err(Error::Config(
                "filter needs at least one hash function".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of bits in the array.
    pub fn size(&self) -> u64 {
        1u64 << self.bit
    }

    /// Expected false-positive rate after `n` insertions:
    /// `(1 - e^(-k n / m))^k`.
    pub fn false_positive_rate(&self, n: u64) -> f64 {
        let k = f64::from(self.hash_number);
        let m = self.size() as f64;
        (1.0 - (-k * n as f64 / m).exp()).powf(k)
    }
}
