//! Byte-budgeted least-recently-used cache.
//!
//! [`LruCache`] is the unsynchronized engine: entries live in a slab and are
//! threaded onto an intrusive doubly linked recency list (head is most
//! recently used, tail is least recently used), with a hash index from key to
//! slab slot. [`EvictionCache`] wraps it in a mutex and forwards removed
//! entries to an optional [`EvictionNotifier`] once the lock is released.

use crate::error::{CacheError, CacheResult};
use crate::eviction::{Evicted, EvictionCause, EvictionNotifier};
use crate::value::ByteSized;
use ahash::AHashMap;
use parking_lot::Mutex;
use slab::Slab;

/// Point-in-time usage of a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Byte budget, 0 when unlimited.
    pub max_bytes: usize,
    /// Bytes charged by live entries.
    pub used_bytes: usize,
    /// Number of live entries.
    pub count: usize,
}

impl CacheStats {
    /// Fold another cache's usage into this one.
    pub fn merge(&mut self, other: &CacheStats) {
        self.max_bytes += other.max_bytes;
        self.used_bytes += other.used_bytes;
        self.count += other.count;
    }

    /// Fraction of the budget in use, in the range `0.0..=1.0`.
    ///
    /// Unlimited caches always report 0.
    pub fn usage_ratio(&self) -> f64 {
        if self.max_bytes == 0 {
            0.0
        } else {
            self.used_bytes as f64 / self.max_bytes as f64
        }
    }
}

struct Node<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<V: ByteSized> Node<V> {
    #[inline]
    fn size(&self) -> usize {
        self.key.len() + self.value.byte_len()
    }
}

/// Unsynchronized LRU engine.
///
/// `used_bytes` always equals the sum of `key.len() + value.byte_len()` over
/// live entries, and never exceeds `max_bytes` after an `add` returns when
/// `max_bytes` is non-zero.
pub struct LruCache<V> {
    entries: Slab<Node<V>>,
    index: AHashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    max_bytes: usize,
    used_bytes: usize,
}

impl<V: ByteSized + Clone> LruCache<V> {
    /// Create an empty cache. A `max_bytes` of 0 disables eviction.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            entries: Slab::new(),
            index: AHashMap::new(),
            head: None,
            tail: None,
            max_bytes,
            used_bytes: 0,
        }
    }

    /// Insert or replace `key`, then evict from the tail until the cache is
    /// back within budget.
    ///
    /// Returns the entries evicted to make room, oldest first.
    pub fn add(&mut self, key: &str, value: V) -> CacheResult<Vec<Evicted<V>>> {
        let size = key.len() + value.byte_len();
        if self.max_bytes != 0 && size > self.max_bytes {
            return Err(CacheError::Oversize {
                size,
                limit: self.max_bytes,
            });
        }

        if let Some(&slot) = self.index.get(key) {
            let node = &mut self.entries[slot];
            let old = node.value.byte_len();
            node.value = value;
            self.used_bytes = self.used_bytes - old + node.value.byte_len();
            self.unlink(slot);
            self.push_front(slot);
        } else {
            let slot = self.entries.insert(Node {
                key: key.to_string(),
                value,
                prev: None,
                next: None,
            });
            self.index.insert(key.to_string(), slot);
            self.used_bytes += size;
            self.push_front(slot);
        }

        let mut evicted = Vec::new();
        while self.max_bytes != 0 && self.used_bytes > self.max_bytes {
            match self.pop_back(EvictionCause::Capacity) {
                Some(e) => evicted.push(e),
                None => break,
            }
        }
        Ok(evicted)
    }

    /// Look up `key`, promoting it to most recently used.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let slot = *self.index.get(key)?;
        self.unlink(slot);
        self.push_front(slot);
        Some(self.entries[slot].value.clone())
    }

    /// Look up `key` without touching recency.
    pub fn peek(&self, key: &str) -> Option<&V> {
        let slot = *self.index.get(key)?;
        Some(&self.entries[slot].value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Remove `key`, returning the removed entry.
    pub fn delete(&mut self, key: &str) -> CacheResult<Evicted<V>> {
        let slot = self
            .index
            .remove(key)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        Ok(self.remove_slot(slot, EvictionCause::Deleted))
    }

    /// Remove the least recently used entry.
    pub fn remove_oldest(&mut self) -> Option<Evicted<V>> {
        self.pop_back(EvictionCause::Capacity)
    }

    /// Snapshot of live keys, most recently used first.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.entries.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let node = &self.entries[slot];
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            max_bytes: self.max_bytes,
            used_bytes: self.used_bytes,
            count: self.entries.len(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    #[inline]
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    fn pop_back(&mut self, cause: EvictionCause) -> Option<Evicted<V>> {
        let slot = self.tail?;
        self.index.remove(&self.entries[slot].key);
        Some(self.remove_slot(slot, cause))
    }

    // Caller has already removed the index entry.
    fn remove_slot(&mut self, slot: usize, cause: EvictionCause) -> Evicted<V> {
        self.unlink(slot);
        let node = self.entries.remove(slot);
        self.used_bytes -= node.size();
        Evicted {
            key: node.key,
            value: node.value,
            cause,
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let node = &self.entries[slot];
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.entries[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entries[n].prev = prev,
            None => self.tail = prev,
        }
        let node = &mut self.entries[slot];
        node.prev = None;
        node.next = None;
    }

    fn push_front(&mut self, slot: usize) {
        let old_head = self.head;
        {
            let node = &mut self.entries[slot];
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.entries[h].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }
}

/// Thread-safe LRU cache with optional eviction notifications.
///
/// Every operation, reads included, takes the exclusive lock since lookups
/// reorder the recency list.
pub struct EvictionCache<V> {
    inner: Mutex<LruCache<V>>,
    notifier: Option<EvictionNotifier<V>>,
}

impl<V: ByteSized + Clone> EvictionCache<V> {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(max_bytes)),
            notifier: None,
        }
    }

    /// Create a cache that reports removed entries to `notifier`.
    pub fn with_notifier(max_bytes: usize, notifier: EvictionNotifier<V>) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(max_bytes)),
            notifier: Some(notifier),
        }
    }

    /// Insert or replace `key`. Returns the number of entries evicted.
    pub fn add(&self, key: &str, value: V) -> CacheResult<usize> {
        let evicted = self.inner.lock().add(key, value)?;
        let count = evicted.len();
        if let Some(notifier) = &self.notifier {
            notifier.notify_all(evicted);
        }
        Ok(count)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.lock().get(key)
    }

    pub fn delete(&self, key: &str) -> CacheResult<()> {
        let removed = self.inner.lock().delete(key)?;
        if let Some(notifier) = &self.notifier {
            notifier.notify(removed);
        }
        Ok(())
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().keys()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn max_bytes(&self) -> usize {
        self.inner.lock().max_bytes()
    }
}
