//! In-process store with Redis semantics.
//!
//! Lets the queues and the filter run without a server: in tests, and for
//! single-process crawls. One mutex guards every key, so each call is atomic
//! exactly as the matching Redis command (or MULTI block) would be. Blocking
//! pops park on a [`Notify`] that every push wakes.

use super::{ListEnd, Store};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

/// A cloneable handle to an in-process store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    keys: Mutex<HashMap<String, Value>>,
    pushed: Notify,
}

#[derive(Debug)]
enum Value {
    List(VecDeque<Vec<u8>>),
    SortedSet(SortedSet),
    Bits(Vec<u8>),
}

/// Members ordered by `(score, member bytes)`, the way Redis ranks them.
#[derive(Debug, Default)]
struct SortedSet {
    ranked: BTreeSet<(Score, Vec<u8>)>,
    scores: HashMap<Vec<u8>, Score>,
}

#[derive(Debug, Clone, Copy)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        // -0.0 and 0.0 rank equal, as in Redis
        self.0
            .partial_cmp(&other.0)
            .unwrap_or_else(|| self.0.total_cmp(&other.0))
    }
}

impl SortedSet {
    fn insert(&mut self, score: Score, member: Vec<u8>) {
        if let Some(old) = self.scores.insert(member.clone(), score) {
            self.ranked.remove(&(old, member.clone()));
        }
        self.ranked.insert((score, member));
    }

    fn pop_first(&mut self) -> Option<Vec<u8>> {
        let (_, member) = self.ranked.pop_first()?;
        self.scores.remove(&member);
        Some(member)
    }

    fn len(&self) -> usize {
        self.ranked.len()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn keys(&self) -> Result<MutexGuard<'_, HashMap<String, Value>>> {
        self.inner
            .keys
            .lock()
            .map_err(|_| Error::Other("memory store lock poisoned".to_string()))
    }

    fn try_pop(&self, key: &str, end: ListEnd) -> Result<Option<Vec<u8>>> {
        let mut keys = self.keys()?;
        let popped = match keys.get_mut(key) {
            None => return Ok(None),
            Some(Value::List(list)) => match end {
                ListEnd::Head => list.pop_front(),
                ListEnd::Tail => list.pop_back(),
            },
            Some(_) => return Err(wrong_type(key)),
        };
        remove_if_empty(&mut keys, key);
        Ok(popped)
    }
}

fn wrong_type(key: &str) -> Error {
    Error::WrongType {
        key: key.to_string(),
    }
}

/// Redis drops lists and sorted sets once their last element goes.
fn remove_if_empty(keys: &mut HashMap<String, Value>, key: &str) {
    let empty = match keys.get(key) {
        Some(Value::List(list)) => list.is_empty(),
        Some(Value::SortedSet(set)) => set.len() == 0,
        _ => false,
    };
    if empty {
        keys.remove(key);
    }
}

/// Redis bitmaps number bits from the most significant bit of byte 0.
fn bit_position(offset: u64) -> (usize, u8) {
    ((offset / 8) as usize, 0x80 >> (offset % 8))
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_push(&self, key: &str, value: Vec<u8>) -> Result<()> {
        {
            let mut keys = self.keys()?;
            let entry = keys
                .entry(key.to_string())
                .or_insert_with(|| Value::List(VecDeque::new()));
            match entry {
                Value::List(list) => list.push_front(value),
                _ => return Err(wrong_type(key)),
            }
        }
        self.inner.pushed.notify_waiters();
        Ok(())
    }

    async fn list_pop(&self, key: &str, end: ListEnd) -> Result<Option<Vec<u8>>> {
        self.try_pop(key, end)
    }

    async fn list_pop_blocking(
        &self,
        key: &str,
        end: ListEnd,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>> {
        // None: the timeout is past any representable instant, so wait forever.
        let deadline = tokio::time::Instant::now().checked_add(timeout);
        loop {
            // Register for wakeups before checking, so a push landing between
            // the check and the wait is not missed.
            let notified = self.inner.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.try_pop(key, end)? {
                return Ok(Some(value));
            }
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn list_len(&self, key: &str) -> Result<usize> {
        match self.keys()?.get(key) {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn zset_add(&self, key: &str, score: f64, member: Vec<u8>) -> Result<()> {
        let mut keys = self.keys()?;
        let entry = keys
            .entry(key.to_string())
            .or_insert_with(|| Value::SortedSet(SortedSet::default()));
        match entry {
            Value::SortedSet(set) => {
                set.insert(Score(score), member);
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn zset_pop_min(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut keys = self.keys()?;
        let popped = match keys.get_mut(key) {
            None => return Ok(None),
            Some(Value::SortedSet(set)) => set.pop_first(),
            Some(_) => return Err(wrong_type(key)),
        };
        remove_if_empty(&mut keys, key);
        Ok(popped)
    }

    async fn zset_len(&self, key: &str) -> Result<usize> {
        match self.keys()?.get(key) {
            None => Ok(0),
            Some(Value::SortedSet(set)) => Ok(set.len()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_bits(&self, key: &str, offsets: &[u64]) -> Result<()> {
        let mut keys = self.keys()?;
        let entry = keys
            .entry(key.to_string())
            .or_insert_with(|| Value::Bits(Vec::new()));
        let Value::Bits(bytes) = entry else {
            return Err(wrong_type(key));
        };
        for &offset in offsets {
            let (byte, mask) = bit_position(offset);
            if bytes.len() <= byte {
                bytes.resize(byte + 1, 0);
            }
            bytes[byte] |= mask;
        }
        Ok(())
    }

    async fn get_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>> {
        let keys = self.keys()?;
        let bytes: &[u8] = match keys.get(key) {
            None => &[],
            Some(Value::Bits(bytes)) => bytes,
            Some(_) => return Err(wrong_type(key)),
        };
        Ok(offsets
            .iter()
            .map(|&offset| {
                let (byte, mask) = bit_position(offset);
                bytes.get(byte).is_some_and(|b| b & mask != 0)
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.keys()?.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.keys().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bits_follow_redis_numbering() {
        let store = MemoryStore::new();
        store.set_bits("b", &[0, 9]).await.unwrap();
        let keys = store.keys().unwrap();
        match keys.get("b") {
            Some(Value::Bits(bytes)) => assert_eq!(bytes.as_slice(), &[0x80, 0x40]),
            other => panic!("expected bitmap, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zadd_existing_member_moves_it() {
        let store = MemoryStore::new();
        store.zset_add("z", 1.0, b"a".to_vec()).await.unwrap();
        store.zset_add("z", 2.0, b"b".to_vec()).await.unwrap();
        store.zset_add("z", 3.0, b"a".to_vec()).await.unwrap();
        assert_eq!(store.zset_len("z").await.unwrap(), 2);
        assert_eq!(store.zset_pop_min("z").await.unwrap(), Some(b"b".to_vec()));
        assert_eq!(store.zset_pop_min("z").await.unwrap(), Some(b"a".to_vec()));
        assert_eq!(store.zset_pop_min("z").await.unwrap(), None);
    }

    #[tokio::test]
    async fn wrong_type_is_reported() {
        let store = MemoryStore::new();
        store.list_push("k", b"x".to_vec()).await.unwrap();
        let err = store.zset_add("k", 0.0, b"y".to_vec()).await.unwrap_err();
        assert!(matches!(err, Error::WrongType { .. }));
    }

    #[tokio::test]
    async fn emptied_list_is_removed() {
        let store = MemoryStore::new();
        store.list_push("k", b"x".to_vec()).await.unwrap();
        store.list_pop("k", ListEnd::Tail).await.unwrap();
        // key is gone, so it can be reused as another type
        store.set_bits("k", &[3]).await.unwrap();
    }
}
