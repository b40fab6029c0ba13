//! Storable payloads.

use bytes::Bytes;
use std::fmt;

/// Anything the cache can account for in bytes.
///
/// The eviction cache charges `key.len() + value.byte_len()` against its
/// budget, so implementations must report a stable length for the lifetime
/// of the value.
pub trait ByteSized {
    fn byte_len(&self) -> usize;
}

/// Immutable byte payload stored in cache groups.
///
/// Values are copied in on insert, so a caller's buffer never aliases
/// stored data, and are handed out as cheap immutable clones.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Value(Bytes);

impl Value {
    /// Copy `data` into a new value.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(data))
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an owned copy of the payload.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Returns the payload as a shared buffer without copying.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl ByteSized for Value {
    #[inline]
    fn byte_len(&self) -> usize {
        self.0.len()
    }
}

impl ByteSized for Bytes {
    #[inline]
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl ByteSized for Vec<u8> {
    #[inline]
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl ByteSized for String {
    #[inline]
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl AsRef<[u8]> for Value {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Value {
    fn from(data: &[u8]) -> Self {
        Self::copy_from_slice(data)
    }
}

impl From<&str> for Value {
    fn from(data: &str) -> Self {
        Self::copy_from_slice(data.as_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}
