//! Sharded LRU router.
//!
//! A [`ShardedCache`] splits one byte budget evenly across a fixed array of
//! [`EvictionCache`]s and routes each key to exactly one of them by hashing.
//! Operations on different shards never contend.

use crate::error::{CacheError, CacheResult};
use crate::eviction::EvictionNotifier;
use crate::lru::{CacheStats, EvictionCache};
use crate::value::ByteSized;
use xxhash_rust::xxh32::xxh32;

/// Shard index for `key` in a router of `shards` shards.
///
/// Pure and deterministic: the same key always maps to the same shard for a
/// given shard count.
#[inline]
pub fn shard_index(key: &str, shards: usize) -> usize {
    xxh32(key.as_bytes(), 0) as usize % shards
}

/// Builder for [`ShardedCache`].
pub struct ShardedCacheBuilder<V> {
    shards: usize,
    capacity: usize,
    notifier: Option<EvictionNotifier<V>>,
}

impl<V: ByteSized + Clone> Default for ShardedCacheBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: ByteSized + Clone> ShardedCacheBuilder<V> {
    pub fn new() -> Self {
        Self {
            shards: 16,
            capacity: 0,
            notifier: None,
        }
    }

    /// Number of shards. Must be non-zero.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Total byte budget across all shards. 0 disables eviction.
    pub fn capacity(mut self, bytes: usize) -> Self {
        self.capacity = bytes;
        self
    }

    /// Report evicted and deleted entries from every shard to `notifier`.
    pub fn notifier(mut self, notifier: EvictionNotifier<V>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn build(self) -> CacheResult<ShardedCache<V>> {
        if self.shards == 0 {
            return Err(CacheError::invalid("shard count must be greater than 0"));
        }
        if self.capacity % self.shards != 0 {
            return Err(CacheError::invalid(format!(
                "capacity {} is not divisible by shard count {}",
                self.capacity, self.shards
            )));
        }

        let per_shard = self.capacity / self.shards;
        let shards = (0..self.shards)
            .map(|_| match &self.notifier {
                Some(n) => EvictionCache::with_notifier(per_shard, n.clone()),
                None => EvictionCache::new(per_shard),
            })
            .collect();

        Ok(ShardedCache { shards })
    }
}

/// Fixed set of LRU shards sharing one byte budget.
pub struct ShardedCache<V> {
    shards: Vec<EvictionCache<V>>,
}

impl<V: ByteSized + Clone> ShardedCache<V> {
    pub fn builder() -> ShardedCacheBuilder<V> {
        ShardedCacheBuilder::new()
    }

    /// Create a router of `shards` shards splitting `capacity` bytes evenly.
    ///
    /// Fails with [`CacheError::InvalidArgument`] when `shards` is zero or
    /// does not divide `capacity`.
    pub fn new(shards: usize, capacity: usize) -> CacheResult<Self> {
        Self::builder().shards(shards).capacity(capacity).build()
    }

    #[inline]
    pub fn shard_of(&self, key: &str) -> usize {
        shard_index(key, self.shards.len().max(1))
    }

    fn shard(&self, key: &str) -> CacheResult<&EvictionCache<V>> {
        if self.shards.is_empty() {
            return Err(CacheError::Uninitialized);
        }
        let idx = self.shard_of(key);
        self.shards.get(idx).ok_or(CacheError::ShardNotFound(idx))
    }

    /// Insert or replace `key` in its shard. Returns the number of entries
    /// evicted from that shard.
    pub fn add(&self, key: &str, value: V) -> CacheResult<usize> {
        self.shard(key)?.add(key, value)
    }

    pub fn get(&self, key: &str) -> CacheResult<Option<V>> {
        Ok(self.shard(key)?.get(key))
    }

    pub fn delete(&self, key: &str) -> CacheResult<()> {
        self.shard(key)?.delete(key)
    }

    /// Keys of every shard, each shard's keys most recently used first.
    pub fn keys(&self) -> Vec<String> {
        self.shards.iter().flat_map(|s| s.keys()).collect()
    }

    /// Usage summed over all shards.
    pub fn stats(&self) -> CacheStats {
        let mut total = CacheStats::default();
        for shard in &self.shards {
            total.merge(&shard.stats());
        }
        total
    }

    pub fn shard_stats(&self) -> Vec<CacheStats> {
        self.shards.iter().map(|s| s.stats()).collect()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.is_empty())
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[cfg(test)]
    fn empty() -> Self {
        Self { shards: Vec::new() }
    }
}
