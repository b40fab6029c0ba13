//! cache-core: byte-budgeted LRU caches, sharding, and named groups.
//!
//! This crate provides the storage engine behind the server:
//!
//! - **Value**: immutable byte payloads and the `ByteSized` capability
//! - **LRU**: `LruCache` engine and the synchronized `EvictionCache`
//! - **Eviction**: bounded-channel notifications for removed entries
//! - **Shard**: `ShardedCache` routing keys to a fixed set of LRU shards
//! - **Group**: named `ShardedCache`s held by a `GroupRegistry`
//!
//! # Architecture
//!
//! ```text
//!          +-------------------------+
//!          |      GroupRegistry      |
//!          |  name -> Arc<Group>     |
//!          +------------+------------+
//!                       |
//!                       v
//!          +-------------------------+
//!          |   ShardedCache<Value>   |
//!          |   xxh32(key) % shards   |
//!          +--+--------+--------+----+
//!             |        |        |
//!             v        v        v
//!          +-----+  +-----+  +-----+
//!          | LRU |  | LRU |  | LRU |  --evicted-->  EvictionNotifier
//!          +-----+  +-----+  +-----+
//! ```
//!
//! # Example
//!
//! ```
//! use cache_core::{GroupRegistry, Value, MIB};
//!
//! let registry = GroupRegistry::new(16);
//! let group = registry.create("test", 100 * MIB).unwrap();
//! group.set("key1", Value::from("value1")).unwrap();
//! assert_eq!(group.get("key1").unwrap().as_slice(), b"value1");
//! ```

#![warn(clippy::all)]

mod error;
mod eviction;
mod group;
mod lru;
mod shard;
mod value;

pub use error::{CacheError, CacheResult};
pub use eviction::{Evicted, EvictionCause, EvictionNotifier, eviction_channel};
pub use group::{
    Group, GroupRegistry, GroupStatus, MIB, RegistryStats, capacity_from_mb, parse_capacity_mb,
};
pub use lru::{CacheStats, EvictionCache, LruCache};
pub use shard::{ShardedCache, ShardedCacheBuilder, shard_index};
pub use value::{ByteSized, Value};
