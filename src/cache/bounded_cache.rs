//! Fixed-capacity key/value cache with insertion-order eviction.
//!
//! Insertion order is tracked by a monotonically increasing sequence number
//! kept in an ordered map, so the oldest entry is always the first key of
//! `order`. Overwriting an existing key is governed by a replace policy and a
//! successful overwrite counts as a fresh insertion.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::errors::{CacheError, CacheResult};

/// Decides whether `incoming` may overwrite `existing` for the same key.
pub type ReplacePolicy<V> = fn(existing: &V, incoming: &V) -> bool;

/// Policy that always accepts the incoming value.
pub fn replace_always<V>(_existing: &V, _incoming: &V) -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub replacements: u64,
    pub rejections: u64,
    pub evictions: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

/// Result of a single `store` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// New key. The cache may have evicted its oldest key to make room.
    Inserted,
    /// Existing key overwritten because the replace policy accepted it.
    Replaced,
    /// Existing key kept because the replace policy refused the new value.
    Rejected,
}

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    slots: HashMap<K, Slot<V>>,
    order: BTreeMap<u64, K>,
    next_seq: u64,
    replace_policy: ReplacePolicy<V>,
    metrics: CacheMetrics,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
{
    const PREALLOCATE_LIMIT: usize = 1 << 16;

    pub fn new(capacity: usize) -> CacheResult<Self> {
        Self::with_replace_policy(capacity, replace_always::<V>)
    }

    pub fn with_replace_policy(capacity: usize, replace_policy: ReplacePolicy<V>) -> CacheResult<Self> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            slots: HashMap::with_capacity(capacity.min(Self::PREALLOCATE_LIMIT)),
            order: BTreeMap::new(),
            next_seq: 0,
            replace_policy,
            metrics: CacheMetrics::default(),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics
    }

    pub fn reset_metrics(&mut self) {
        self.metrics = CacheMetrics::default();
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
        self.next_seq = 0;
        self.metrics = CacheMetrics::default();
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    /// Lookup that counts toward hit/miss metrics.
    pub fn try_get(&mut self, key: &K) -> Option<&V> {
        self.metrics.lookups += 1;
        match self.slots.get(key) {
            Some(slot) => {
                self.metrics.hits += 1;
                Some(&slot.value)
            }
            None => {
                self.metrics.misses += 1;
                None
            }
        }
    }

    /// Lookup without touching metrics.
    #[inline]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.slots.get(key).map(|slot| &slot.value)
    }

    /// Insert or overwrite `key`.
    ///
    /// Returns the outcome and, for an insertion at capacity, the key that was
    /// evicted (always the least recently inserted one).
    pub fn store(&mut self, key: K, value: V) -> (StoreOutcome, Option<K>) {
        self.metrics.stores += 1;
        let seq = self.next_seq;

        if let Some(slot) = self.slots.get_mut(&key) {
            if !(self.replace_policy)(&slot.value, &value) {
                self.metrics.rejections += 1;
                return (StoreOutcome::Rejected, None);
            }
            self.order.remove(&slot.seq);
            slot.value = value;
            slot.seq = seq;
            self.order.insert(seq, key);
            self.next_seq += 1;
            self.metrics.replacements += 1;
            return (StoreOutcome::Replaced, None);
        }

        let evicted = if self.slots.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        self.slots.insert(key.clone(), Slot { value, seq });
        self.order.insert(seq, key);
        self.next_seq += 1;
        (StoreOutcome::Inserted, evicted)
    }

    fn evict_oldest(&mut self) -> Option<K> {
        let (_, oldest) = self.order.pop_first()?;
        self.slots.remove(&oldest);
        self.metrics.evictions += 1;
        Some(oldest)
    }

    /// Keys from oldest to newest insertion.
    ///
    /// The iterator borrows the cache, so the cache cannot be mutated while
    /// it is alive. Calling `keys` again restarts from the oldest key.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.values()
    }

    /// Key/value pairs from oldest to newest insertion.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.order
            .values()
            .filter_map(|key| self.slots.get(key).map(|slot| (key, &slot.value)))
    }
}
