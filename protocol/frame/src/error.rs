//! Error types for frame parsing and body decoding.

/// Failure decoding a complete message body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Fewer than four bytes remained where a field length was expected.
    #[error("malformed length prefix for field {field}")]
    MalformedLength { field: &'static str },

    /// A field declared more bytes than the body holds.
    #[error("field {field} declares {len} bytes but only {remaining} remain")]
    Truncated {
        field: &'static str,
        len: usize,
        remaining: usize,
    },

    /// A textual field is not valid UTF-8.
    #[error("field {field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },
}

/// Failure parsing a frame out of a byte stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Need more data to complete the frame.
    #[error("incomplete")]
    Incomplete,

    /// The frame is complete but its body could not be decoded.
    ///
    /// `consumed` covers the header and the whole body, so the caller can
    /// skip exactly this frame and continue with the next.
    #[error("malformed frame: {source}")]
    Malformed {
        consumed: usize,
        source: DecodeError,
    },

    /// The declared body length exceeds the configured limit.
    #[error("frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },
}

impl ParseError {
    /// Returns true if more bytes are needed.
    #[inline]
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete)
    }
}
