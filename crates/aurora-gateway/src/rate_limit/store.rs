//! In-process rate-limit record store.
//!
//! Records live in a sharded [`DashMap`]; a read-modify-write of one key holds
//! that key's shard lock for the whole update, so concurrent requests for the
//! same key never lose a count.

use async_trait::async_trait;
use aurora_kernel::gateway::{RateLimitRecord, RateLimitStore};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Bounded in-memory store. Each new key gets a monotonically increasing
/// insertion sequence used to find the oldest records on eviction.
pub struct InMemoryRateLimitStore {
    records: DashMap<String, RateLimitRecord>,
    next_seq: AtomicU64,
    max_entries: usize,
    eviction_percent: u8,
}

impl InMemoryRateLimitStore {
    pub fn new(max_entries: usize, eviction_percent: u8) -> Self {
        Self {
            records: DashMap::new(),
            next_seq: AtomicU64::new(0),
            max_entries: max_entries.max(1),
            eviction_percent: eviction_percent.clamp(1, 100),
        }
    }

    /// Drop the oldest records until there is room for one more key.
    ///
    /// Concurrent inserters may both evict; the map can briefly exceed the
    /// ceiling by the number of in-flight inserts, never more.
    fn make_room(&self) {
        let len = self.records.len();
        if len < self.max_entries {
            return;
        }
        let batch = (len * self.eviction_percent as usize / 100)
            .max(len + 1 - self.max_entries)
            .max(1);

        let mut by_age: Vec<(u64, String)> = self
            .records
            .iter()
            .map(|r| (r.value().seq, r.key().clone()))
            .collect();
        by_age.sort_unstable_by_key(|(seq, _)| *seq);

        let evicted = by_age
            .into_iter()
            .take(batch)
            .filter(|(_, key)| self.records.remove(key).is_some())
            .count();
        debug!(evicted, tracked = len, "rate-limit store at capacity, evicted oldest keys");
    }

    fn stamp(&self, mut record: RateLimitRecord) -> RateLimitRecord {
        record.seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        record
    }
}

impl Default for InMemoryRateLimitStore {
    fn default() -> Self {
        Self::new(10_000, 20)
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn get(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.get(key).map(|r| *r.value())
    }

    async fn set(&self, key: &str, record: RateLimitRecord) {
        if !self.records.contains_key(key) {
            self.make_room();
            let record = self.stamp(record);
            self.records.insert(key.to_string(), record);
        } else {
            self.records.insert(key.to_string(), record);
        }
    }

    async fn delete(&self, key: &str) -> bool {
        self.records.remove(key).is_some()
    }

    async fn update(
        &self,
        key: &str,
        f: &mut (dyn for<'r> FnMut(Option<&'r RateLimitRecord>) -> RateLimitRecord + Send),
    ) -> RateLimitRecord {
        if !self.records.contains_key(key) {
            self.make_room();
        }
        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let next = f(Some(occupied.get()));
                occupied.insert(next);
                next
            }
            Entry::Vacant(vacant) => {
                let next = self.stamp(f(None));
                vacant.insert(next);
                next
            }
        }
    }

    async fn sweep(&self, now_ms: u64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now_ms));
        before.saturating_sub(self.records.len())
    }

    async fn len(&self) -> usize {
        self.records.len()
    }
}
