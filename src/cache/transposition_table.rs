//! Transposition table keyed by 64-bit position fingerprint.
//!
//! Backed by a `BoundedCache` with depth-preferred replacement: an entry for
//! a fingerprint is only overwritten by a strictly deeper result. Capacity is
//! derived from a byte budget rather than an entry count.

use std::fmt;
use std::str::FromStr;

use crate::cache::bounded_cache::{BoundedCache, CacheMetrics, StoreOutcome};
use crate::errors::{CacheError, CacheResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundType {
    Exact,
    LowerBound,
    UpperBound,
}

impl BoundType {
    pub const fn name(self) -> &'static str {
        match self {
            BoundType::Exact => "Exact",
            BoundType::LowerBound => "LowerBound",
            BoundType::UpperBound => "UpperBound",
        }
    }
}

impl fmt::Display for BoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BoundType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Exact" => Ok(BoundType::Exact),
            "LowerBound" => Ok(BoundType::LowerBound),
            "UpperBound" => Ok(BoundType::UpperBound),
            other => Err(format!("unknown bound type '{other}'")),
        }
    }
}

/// Search result cached for one position.
#[derive(Debug, Clone, PartialEq)]
pub struct TranspositionTableEntry<M> {
    pub bound: BoundType,
    pub value: f64,
    pub depth: u32,
    pub best_move: Option<M>,
}

/// Deeper results win; equal depth keeps what is already stored.
pub fn deeper_entry_wins<M>(
    existing: &TranspositionTableEntry<M>,
    incoming: &TranspositionTableEntry<M>,
) -> bool {
    incoming.depth > existing.depth
}

#[derive(Debug, Clone)]
pub struct TranspositionTable<M> {
    cache: BoundedCache<u64, TranspositionTableEntry<M>>,
}

impl<M: Clone> TranspositionTable<M> {
    /// Share of the budget handed to entries; the rest is allocator slack.
    pub const FILL_FACTOR: f64 = 0.92;

    /// Per-entry bookkeeping beyond the key and payload: hash map control
    /// bytes and load-factor headroom, plus the ordered insertion index node
    /// (sequence number, key copy and amortised tree node overhead).
    /// Tunable estimate, not derived from allocator internals.
    pub const ENTRY_OVERHEAD_BYTES: usize = 64;

    /// Estimated in-memory size of one stored entry.
    pub fn entry_size_bytes() -> usize {
        std::mem::size_of::<u64>()
            + std::mem::size_of::<TranspositionTableEntry<M>>()
            + Self::ENTRY_OVERHEAD_BYTES
    }

    /// `1 + floor(FILL_FACTOR * budget / entry_size)`.
    pub fn capacity_for_budget(budget_bytes: u64) -> CacheResult<usize> {
        let entry_bytes = Self::entry_size_bytes();
        if budget_bytes < entry_bytes as u64 {
            return Err(CacheError::BudgetTooSmall {
                budget_bytes,
                entry_bytes,
            });
        }
        let usable = (Self::FILL_FACTOR * budget_bytes as f64 / entry_bytes as f64).floor();
        Ok(1 + usable as usize)
    }

    pub fn with_budget(budget_bytes: u64) -> CacheResult<Self> {
        Self::with_capacity(Self::capacity_for_budget(budget_bytes)?)
    }

    pub fn new_with_mb(size_mb: u64) -> CacheResult<Self> {
        Self::with_budget(size_mb.saturating_mul(1024 * 1024))
    }

    pub fn with_capacity(capacity: usize) -> CacheResult<Self> {
        Ok(Self {
            cache: BoundedCache::with_replace_policy(capacity, deeper_entry_wins::<M>)?,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cache.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[inline]
    pub fn stats(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn probe(&mut self, key: u64) -> Option<&TranspositionTableEntry<M>> {
        self.cache.try_get(&key)
    }

    #[inline]
    pub fn peek(&self, key: u64) -> Option<&TranspositionTableEntry<M>> {
        self.cache.peek(&key)
    }

    pub fn store(&mut self, key: u64, entry: TranspositionTableEntry<M>) -> StoreOutcome {
        self.cache.store(key, entry).0
    }

    /// Fingerprints from oldest to newest insertion.
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.cache.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &TranspositionTableEntry<M>)> + '_ {
        self.cache.iter().map(|(key, entry)| (*key, entry))
    }
}
