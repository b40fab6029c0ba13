//! Consistent hash ring.
//!
//! Each physical node is expanded into `replicas` virtual replicas. Replica
//! `i` of node `n` is hashed as MD5(`n` followed by the decimal digits of
//! `i`), and the 16-byte digest yields four points on the 32-bit circle, one
//! per little-endian 4-byte window. A key is hashed the same way but only its
//! first window is used; it belongs to the node owning the first point at or
//! after that value, wrapping around to the lowest point.
//!
//! ```
//! use hash_ring::HashRing;
//!
//! let mut ring = HashRing::new();
//! ring.add_nodes(["10.0.0.1:9000", "10.0.0.2:9000"]);
//! let owner = ring.locate("user:42").unwrap();
//! assert!(ring.contains(owner));
//! ```

use md5::{Digest, Md5};

/// Virtual replicas per node unless configured otherwise.
pub const DEFAULT_REPLICAS: usize = 160;

/// Points contributed by each virtual replica.
const POINTS_PER_REPLICA: usize = 4;

#[inline]
fn digest(data: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&Md5::digest(data));
    out
}

#[inline]
fn point(digest: &[u8; 16], window: usize) -> u32 {
    let at = window * 4;
    u32::from_le_bytes([
        digest[at],
        digest[at + 1],
        digest[at + 2],
        digest[at + 3],
    ])
}

/// Sorted ring of `(point, node)` pairs.
#[derive(Debug, Clone)]
pub struct HashRing {
    replicas: usize,
    nodes: Vec<String>,
    // (point, index into nodes), kept sorted by point
    points: Vec<(u32, usize)>,
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}

impl HashRing {
    pub fn new() -> Self {
        Self::with_replicas(DEFAULT_REPLICAS)
    }

    pub fn with_replicas(replicas: usize) -> Self {
        Self {
            replicas,
            nodes: Vec::new(),
            points: Vec::new(),
        }
    }

    /// Add physical nodes to the ring. Nodes already present are skipped.
    pub fn add_nodes<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buf = String::new();
        for node in nodes {
            let node = node.as_ref();
            if self.contains(node) {
                continue;
            }
            let idx = self.nodes.len();
            self.nodes.push(node.to_string());
            self.points.reserve(self.replicas * POINTS_PER_REPLICA);

            for replica in 0..self.replicas {
                buf.clear();
                buf.push_str(node);
                buf.push_str(&replica.to_string());
                let d = digest(buf.as_bytes());
                for window in 0..POINTS_PER_REPLICA {
                    self.points.push((point(&d, window), idx));
                }
            }
        }
        // stable, so equal points resolve to the earliest added node
        self.points.sort_by_key(|&(p, _)| p);
    }

    /// Node owning `key`, or `None` when the ring is empty.
    pub fn locate(&self, key: &str) -> Option<&str> {
        if self.points.is_empty() {
            return None;
        }
        let hash = point(&digest(key.as_bytes()), 0);
        let mut idx = self.points.partition_point(|&(p, _)| p < hash);
        if idx == self.points.len() {
            idx = 0;
        }
        let (_, node) = self.points[idx];
        Some(&self.nodes[node])
    }

    /// Registered physical nodes, in the order they were added.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.iter().any(|n| n == node)
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Number of points on the ring.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
