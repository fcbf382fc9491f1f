//! Bounded, cost-weighted in-memory tier
//!
//! Entries are kept in recency order. After every mutation the store evicts
//! least-recently-used entries until both the entry count and the aggregate
//! cost are within their limits.

use crate::key::CacheKey;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

struct Slot<V> {
    value: V,
    cost: u64,
}

struct Inner<V> {
    entries: LruCache<CacheKey, Slot<V>>,
    total_cost: u64,
    count_limit: usize,
    cost_limit: u64,
    evictions: u64,
}

impl<V> Inner<V> {
    fn evict_to_fit(&mut self) {
        while self.entries.len() > self.count_limit || self.total_cost > self.cost_limit {
            let Some((key, slot)) = self.entries.pop_lru() else {
                break;
            };
            self.total_cost -= slot.cost;
            self.evictions += 1;
            trace!(key = %key, cost = slot.cost, "Evicted memory entry");
        }
    }
}

/// Thread-safe LRU index from [`CacheKey`] to a cloneable value
pub struct MemoryStore<V> {
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> MemoryStore<V> {
    /// Create a store bounded by `count_limit` entries and `cost_limit`
    /// aggregate cost. A count limit of zero is raised to one.
    pub fn new(count_limit: usize, cost_limit: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                total_cost: 0,
                count_limit: count_limit.max(1),
                cost_limit,
                evictions: 0,
            }),
        }
    }

    /// Insert or replace an entry, then evict until within bounds. An entry
    /// whose cost alone exceeds the cost limit is evicted immediately.
    pub fn put(&self, key: CacheKey, value: V, cost: u64) {
        let mut inner = self.inner.lock();
        if let Some(old) = inner.entries.put(key, Slot { value, cost }) {
            inner.total_cost -= old.cost;
        }
        inner.total_cost += cost;
        inner.evict_to_fit();
    }

    /// Look up an entry, marking it most recently used
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let mut inner = self.inner.lock();
        inner.entries.get(key).map(|slot| slot.value.clone())
    }

    /// Check for an entry without touching its recency
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().entries.contains(key)
    }

    pub fn remove(&self, key: &CacheKey) {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.entries.pop(key) {
            inner.total_cost -= slot.cost;
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.total_cost = 0;
    }

    pub fn set_count_limit(&self, count_limit: usize) {
        let mut inner = self.inner.lock();
        inner.count_limit = count_limit.max(1);
        inner.evict_to_fit();
    }

    pub fn set_cost_limit(&self, cost_limit: u64) {
        let mut inner = self.inner.lock();
        inner.cost_limit = cost_limit;
        inner.evict_to_fit();
    }

    pub fn count_limit(&self) -> usize {
        self.inner.lock().count_limit
    }

    pub fn cost_limit(&self) -> u64 {
        self.inner.lock().cost_limit
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_cost(&self) -> u64 {
        self.inner.lock().total_cost
    }

    /// Number of entries evicted to honour the bounds since creation
    pub fn evictions(&self) -> u64 {
        self.inner.lock().evictions
    }
}
