//! Error types for cache, shard and group operations.

/// Errors that can occur during cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Key is not present in the cache.
    #[error("key not found: {0}")]
    NotFound(String),

    /// No group is registered under this name.
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// A group with this name already exists.
    #[error("group {0} already exists")]
    AlreadyExists(String),

    /// A single entry is larger than the whole byte budget of its cache.
    #[error("entry of {size} bytes exceeds cache limit of {limit} bytes")]
    Oversize { size: usize, limit: usize },

    /// The router holds no shards.
    #[error("cache is uninitialized")]
    Uninitialized,

    /// The computed shard index has no backing cache.
    #[error("shard {0} not found")]
    ShardNotFound(usize),

    /// A caller-supplied argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CacheError {
    /// Returns true for both missing keys and missing groups.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::GroupNotFound(_))
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            CacheError::NotFound("k".to_string()).to_string(),
            "key not found: k"
        );
        assert_eq!(
            CacheError::AlreadyExists("g".to_string()).to_string(),
            "group g already exists"
        );
        assert_eq!(
            CacheError::Oversize { size: 10, limit: 4 }.to_string(),
            "entry of 10 bytes exceeds cache limit of 4 bytes"
        );
        assert_eq!(
            CacheError::Uninitialized.to_string(),
            "cache is uninitialized"
        );
        assert_eq!(
            CacheError::invalid("capacity must be a number").to_string(),
            "invalid argument: capacity must be a number"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(CacheError::NotFound("a".into()).is_not_found());
        assert!(CacheError::GroupNotFound("a".into()).is_not_found());
        assert!(!CacheError::ShardNotFound(3).is_not_found());
    }
}
