//! Integration tests for the store-backed Bloom filter.

use crawl_frontier::error::Error;
use crawl_frontier::filter::{BloomFilter, FilterConfig};
use crawl_frontier::store::{MemoryStore, Store};
use std::sync::Arc;
use uuid::Uuid;

fn filter(bit: u32, hash_number: u32) -> BloomFilter {
    BloomFilter::new(
        Arc::new(MemoryStore::new()),
        "job:dedup",
        FilterConfig { bit, hash_number },
    )
    .unwrap()
}

#[tokio::test]
async fn inserted_values_always_exist() {
    let f = filter(20, 4);
    let values: Vec<String> = (0..500)
        .map(|i| format!("https://www.taptap.com/app/{i}/review"))
        .collect();
    for v in &values {
        f.insert(v).await.unwrap();
    }
    for v in &values {
        assert!(f.exists(v).await.unwrap(), "false negative for {v}");
    }
}

#[tokio::test]
async fn unseen_value_does_not_exist_in_empty_filter() {
    let f = filter(20, 4);
    assert!(!f.exists("http://example.com/").await.unwrap());
}

#[tokio::test]
async fn empty_value_never_exists() {
    let f = filter(10, 3);
    f.insert("").await.unwrap();
    f.insert("anything").await.unwrap();
    assert!(!f.exists("").await.unwrap());
}

#[tokio::test]
async fn false_positive_rate_stays_low() {
    let config = FilterConfig {
        bit: 20,
        hash_number: 4,
    };
    let f = filter(config.bit, config.hash_number);
    for _ in 0..1_000 {
        f.insert(&Uuid::new_v4().to_string()).await.unwrap();
    }

    let probes = 10_000;
    let mut false_positives = 0;
    for _ in 0..probes {
        if f.exists(&Uuid::new_v4().to_string()).await.unwrap() {
            false_positives += 1;
        }
    }
    let rate = f64::from(false_positives) / f64::from(probes);
    assert!(rate < 0.03, "false positive rate {rate}");
}

#[tokio::test]
async fn offsets_use_one_distinct_seed_per_hash() {
    let f = filter(16, 5);
    let offsets = f.offsets("http://example.com/some/long/path?q=1");
    assert_eq!(offsets.len(), 5);
    assert!(offsets.iter().all(|&o| o < 1 << 16));
}

#[tokio::test]
async fn insert_sets_exactly_the_probed_bits() {
    let store = Arc::new(MemoryStore::new());
    let f = BloomFilter::new(
        store.clone(),
        "job:dedup",
        FilterConfig {
            bit: 12,
            hash_number: 3,
        },
    )
    .unwrap();
    let offsets = f.offsets("http://example.com/");
    f.insert("http://example.com/").await.unwrap();

    let bits = store.get_bits("job:dedup", &offsets).await.unwrap();
    assert!(bits.iter().all(|&b| b));
    let untouched: Vec<u64> = (0..1 << 12).filter(|o| !offsets.contains(o)).collect();
    let rest = store.get_bits("job:dedup", &untouched).await.unwrap();
    assert!(rest.iter().all(|&b| !b));
}

#[tokio::test]
async fn filters_with_different_keys_are_independent() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let config = FilterConfig {
        bit: 16,
        hash_number: 4,
    };
    let a = BloomFilter::new(Arc::clone(&store), "alpha:dedup", config).unwrap();
    let b = BloomFilter::new(store, "beta:dedup", config).unwrap();
    a.insert("http://example.com/").await.unwrap();
    assert!(a.exists("http://example.com/").await.unwrap());
    assert!(!b.exists("http://example.com/").await.unwrap());
}

#[test]
fn invalid_sizing_is_rejected() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    for (bit, hash_number) in [(0, 4), (33, 4), (20, 0)] {
        let err = BloomFilter::new(Arc::clone(&store), "k", FilterConfig { bit, hash_number })
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)), "bit={bit} k={hash_number}");
    }
}

#[test]
fn expected_false_positive_rate_follows_formula() {
    let config = FilterConfig {
        bit: 20,
        hash_number: 4,
    };
    assert_eq!(config.false_positive_rate(0), 0.0);
    let p = config.false_positive_rate(1_000);
    assert!(p > 0.0 && p < 1e-6, "p = {p}");
    assert!(config.false_positive_rate(1_000_000) > p);
}
