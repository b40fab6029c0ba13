//! Named cache groups and the registry that owns them.

use crate::error::{CacheError, CacheResult};
use crate::eviction::EvictionNotifier;
use crate::lru::CacheStats;
use crate::shard::ShardedCache;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One mebibyte. Group capacities are given in multiples of this.
pub const MIB: usize = 1024 * 1024;

/// Parse a decimal capacity in mebibytes into bytes.
pub fn parse_capacity_mb(s: &str) -> CacheResult<usize> {
    let mb: usize = s
        .trim()
        .parse()
        .map_err(|_| CacheError::invalid(format!("capacity must be a number: {s:?}")))?;
    capacity_from_mb(mb)
}

/// Convert a capacity in mebibytes into bytes.
pub fn capacity_from_mb(mb: usize) -> CacheResult<usize> {
    if mb == 0 {
        return Err(CacheError::invalid("capacity must be greater than 0"));
    }
    mb.checked_mul(MIB)
        .ok_or_else(|| CacheError::invalid(format!("capacity of {mb} MB is too large")))
}

fn require_key(key: &str) -> CacheResult<()> {
    if key.is_empty() {
        Err(CacheError::invalid("key is required"))
    } else {
        Ok(())
    }
}

/// A named, independently budgeted cache namespace.
pub struct Group {
    name: String,
    cache: ShardedCache<Value>,
}

impl Group {
    fn new(
        name: &str,
        capacity: usize,
        shards: usize,
        notifier: Option<&EvictionNotifier<Value>>,
    ) -> CacheResult<Self> {
        let mut builder = ShardedCache::builder().shards(shards).capacity(capacity);
        if let Some(n) = notifier {
            builder = builder.notifier(n.clone());
        }
        Ok(Self {
            name: name.to_string(),
            cache: builder.build()?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte budget fixed at creation.
    pub fn capacity(&self) -> usize {
        self.cache.stats().max_bytes
    }

    /// Look up `key`, failing with [`CacheError::NotFound`] on a miss.
    pub fn get(&self, key: &str) -> CacheResult<Value> {
        require_key(key)?;
        self.cache
            .get(key)?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Insert or replace `key`. Returns the number of entries evicted.
    pub fn set(&self, key: &str, value: Value) -> CacheResult<usize> {
        require_key(key)?;
        self.cache.add(key, value)
    }

    pub fn delete(&self, key: &str) -> CacheResult<()> {
        require_key(key)?;
        self.cache.delete(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.cache.keys()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn status(&self) -> GroupStatus {
        let stats = self.cache.stats();
        GroupStatus {
            name: self.name.clone(),
            max_bytes: stats.max_bytes,
            used_bytes: stats.used_bytes,
            key_count: stats.count,
        }
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("shards", &self.cache.shard_count())
            .field("stats", &self.cache.stats())
            .finish()
    }
}

/// Usage snapshot of one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStatus {
    pub name: String,
    pub max_bytes: usize,
    pub used_bytes: usize,
    pub key_count: usize,
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size_mb = self.max_bytes as f64 / MIB as f64;
        let used_mb = self.used_bytes as f64 / MIB as f64;
        let usage = if self.max_bytes == 0 {
            0.0
        } else {
            self.used_bytes as f64 / self.max_bytes as f64 * 100.0
        };
        writeln!(f, "Group Status:")?;
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Size: {size_mb:.2} MB")?;
        writeln!(f, "Used: {used_mb:.2} MB")?;
        writeln!(f, "Usage Rate: {usage:.2}%")?;
        writeln!(f, "Key Count: {}", self.key_count)
    }
}

/// Usage of every group in a registry plus the totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub groups: Vec<GroupStatus>,
    pub total: CacheStats,
}

/// Mapping from group name to group.
///
/// Creation and deletion take the write lock; lookups share the read lock
/// and hand out an `Arc<Group>`, so cache operations on a found group run
/// without holding the registry lock at all.
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
    shards: usize,
    notifier: Option<EvictionNotifier<Value>>,
}

impl GroupRegistry {
    /// Create an empty registry whose groups each use `shards` shards.
    pub fn new(shards: usize) -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            shards,
            notifier: None,
        }
    }

    /// Create an empty registry whose groups report evictions to `notifier`.
    pub fn with_notifier(shards: usize, notifier: EvictionNotifier<Value>) -> Self {
        Self {
            notifier: Some(notifier),
            ..Self::new(shards)
        }
    }

    pub fn shards(&self) -> usize {
        self.shards
    }

    /// Create a group with a budget of `capacity` bytes.
    pub fn create(&self, name: &str, capacity: usize) -> CacheResult<Arc<Group>> {
        if name.is_empty() {
            return Err(CacheError::invalid("group name can't be empty"));
        }

        let mut groups = self.groups.write();
        if groups.contains_key(name) {
            return Err(CacheError::AlreadyExists(name.to_string()));
        }
        let group = Arc::new(Group::new(
            name,
            capacity,
            self.shards,
            self.notifier.as_ref(),
        )?);
        groups.insert(name.to_string(), group.clone());
        Ok(group)
    }

    pub fn get(&self, name: &str) -> CacheResult<Arc<Group>> {
        self.groups
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::GroupNotFound(name.to_string()))
    }

    /// Remove a group. Operations already holding the group finish normally.
    pub fn delete(&self, name: &str) -> CacheResult<()> {
        self.groups
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CacheError::GroupNotFound(name.to_string()))
    }

    /// Group names in sorted order.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    /// Per-group usage, sorted by name, plus totals.
    pub fn stats(&self) -> RegistryStats {
        let groups: Vec<Arc<Group>> = self.groups.read().values().cloned().collect();
        let mut stats = RegistryStats::default();
        for group in groups {
            let s = group.stats();
            stats.total.merge(&s);
            stats.groups.push(group.status());
        }
        stats.groups.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }
}

impl fmt::Debug for GroupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupRegistry")
            .field("groups", &self.list())
            .field("shards", &self.shards)
            .finish()
    }
}
