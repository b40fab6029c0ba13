//! Field and frame primitives shared by requests and responses.
//!
//! A frame is `[u32 BE body length][body]` and a body is a sequence of
//! fields, each `[u32 BE length][bytes]`.

use crate::error::{DecodeError, ParseError};
use bytes::{BufMut, Bytes, BytesMut};

/// Size of every length prefix.
pub const HEADER_LEN: usize = 4;

/// Largest body accepted by [`ParseOptions::default`].
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Limits applied while parsing frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum declared body length.
    pub max_frame_len: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }
}

#[inline]
pub(crate) fn field_len(data: &[u8]) -> usize {
    HEADER_LEN + data.len()
}

#[inline]
pub(crate) fn put_field(buf: &mut BytesMut, data: &[u8]) {
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);
}

/// Split a complete frame off the front of `buf`.
///
/// Returns the body and the total bytes (header included) it occupies.
pub(crate) fn split_frame<'a>(
    buf: &'a [u8],
    options: &ParseOptions,
) -> Result<(&'a [u8], usize), ParseError> {
    if buf.len() < HEADER_LEN {
        return Err(ParseError::Incomplete);
    }
    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if len > options.max_frame_len {
        return Err(ParseError::FrameTooLarge {
            len,
            max: options.max_frame_len,
        });
    }
    let total = HEADER_LEN + len;
    if buf.len() < total {
        return Err(ParseError::Incomplete);
    }
    Ok((&buf[HEADER_LEN..total], total))
}

/// Sequential reader over the fields of a body.
pub(crate) struct FieldReader<'a> {
    body: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(body: &'a [u8]) -> Self {
        Self { body, pos: 0 }
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.body.len() - self.pos
    }

    pub(crate) fn read_bytes(&mut self, field: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < HEADER_LEN {
            return Err(DecodeError::MalformedLength { field });
        }
        let p = self.pos;
        let len = u32::from_be_bytes([
            self.body[p],
            self.body[p + 1],
            self.body[p + 2],
            self.body[p + 3],
        ]) as usize;
        self.pos += HEADER_LEN;

        let remaining = self.remaining();
        if remaining < len {
            return Err(DecodeError::Truncated {
                field,
                len,
                remaining,
            });
        }
        let data = &self.body[self.pos..self.pos + len];
        self.pos += len;
        Ok(data)
    }

    pub(crate) fn read_string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let data = self.read_bytes(field)?;
        std::str::from_utf8(data)
            .map(str::to_string)
            .map_err(|_| DecodeError::InvalidUtf8 { field })
    }

    pub(crate) fn read_payload(&mut self, field: &'static str) -> Result<Bytes, DecodeError> {
        self.read_bytes(field).map(Bytes::copy_from_slice)
    }
}
