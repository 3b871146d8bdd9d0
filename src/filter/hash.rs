//! Seeded polynomial hash used by the Bloom filter.

/// One member of a family of seeded hashes over a table of `m` slots.
///
/// `m` must be a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashFamily {
    m: u64,
    seed: u64,
}

impl HashFamily {
    pub fn new(m: u64, seed: u64) -> Self {
        debug_assert!(m.is_power_of_two(), "table size must be a power of two");
        Self { m, seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Index of `value` in `[0, m)`.
    ///
    /// Defined as the rolling accumulation `acc = seed * acc + ord(c)` over
    /// the characters of `value`, in unbounded-precision integers, masked
    /// with `m - 1`. The loop below runs in wrapping `u64` arithmetic
    /// instead: reducing modulo 2^64 commutes with `+` and `*`, and `m`
    /// divides 2^64, so the low bits kept by the mask are exactly those of
    /// the unbounded result. Results are identical on every platform and for
    /// inputs of any length.
    pub fn hash(&self, value: &str) -> u64 {
        let acc = value.chars().fold(0u64, |acc, c| {
            self.seed.wrapping_mul(acc).wrapping_add(u64::from(c))
        });
        acc & (self.m - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference: the same recurrence with the modulus applied at every step.
    fn reference(m: u64, seed: u64, value: &str) -> u64 {
        let m = u128::from(m);
        let mut acc: u128 = 0;
        for c in value.chars() {
            acc = (u128::from(seed) * acc + u128::from(u32::from(c))) % m;
        }
        acc as u64
    }

    #[test]
    fn matches_exact_arithmetic_on_short_input() {
        // 31 * (31 * 'a' + 'b') + 'c', no overflow anywhere
        let h = HashFamily::new(1 << 30, 31);
        let exact = 31 * (31 * 97 + 98) + 99;
        assert_eq!(h.hash("abc"), exact & ((1 << 30) - 1));
    }

    #[test]
    fn long_input_matches_modular_reference() {
        let value = "https://www.taptap.com/app/12345/review?order=default&page=".repeat(20);
        for seed in 0..8 {
            for bit in [4u32, 20, 30, 32] {
                let m = 1u64 << bit;
                assert_eq!(HashFamily::new(m, seed).hash(&value), reference(m, seed, &value));
            }
        }
    }

    #[test]
    fn uses_code_points_not_bytes() {
        let h = HashFamily::new(1 << 20, 7);
        assert_eq!(h.hash("é"), 0xE9);
        assert_eq!(h.hash("日本"), reference(1 << 20, 7, "日本"));
    }

    #[test]
    fn index_is_within_table() {
        let h = HashFamily::new(1 << 8, 5);
        for s in ["", "a", "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz", "http://example.com/"] {
            assert!(h.hash(s) < 256);
        }
    }

    #[test]
    fn empty_input_hashes_to_zero() {
        assert_eq!(HashFamily::new(1 << 10, 3).hash(""), 0);
    }
}
