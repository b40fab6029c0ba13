//! Eviction notifications.
//!
//! Entries removed from an [`EvictionCache`](crate::EvictionCache) are handed
//! to an optional observer through a bounded channel. Notices are sent only
//! after the shard lock has been released, and a slow or absent consumer can
//! never stall cache mutation: when the channel is full the notice is dropped
//! and counted.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionCause {
    /// Removed to bring the cache back under its byte budget.
    Capacity,
    /// Removed by an explicit delete.
    Deleted,
}

/// An entry that left the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evicted<V> {
    pub key: String,
    pub value: V,
    pub cause: EvictionCause,
}

/// Sending half of an eviction channel.
///
/// Cloning is cheap; every shard of a router holds a clone.
#[derive(Debug)]
pub struct EvictionNotifier<V> {
    tx: Sender<Evicted<V>>,
    dropped: Arc<AtomicU64>,
}

impl<V> Clone for EvictionNotifier<V> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            dropped: self.dropped.clone(),
        }
    }
}

impl<V> EvictionNotifier<V> {
    /// Hand off one notice without blocking.
    pub fn notify(&self, evicted: Evicted<V>) {
        match self.tx.try_send(evicted) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Hand off a batch of notices collected under a lock.
    pub fn notify_all(&self, evicted: impl IntoIterator<Item = Evicted<V>>) {
        for e in evicted {
            self.notify(e);
        }
    }

    /// Number of notices dropped because the channel was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Create a bounded eviction channel.
///
/// A bound of zero produces a rendezvous channel, which in practice drops
/// every notice unless a receiver is blocked in `recv` at the time.
pub fn eviction_channel<V>(bound: usize) -> (EvictionNotifier<V>, Receiver<Evicted<V>>) {
    let (tx, rx) = crossbeam_channel::bounded(bound);
    (
        EvictionNotifier {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}
