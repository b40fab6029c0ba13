//! Per-connection state for the cache server.

use bytes::{Buf, BytesMut};
use protocol_frame::{HEADER_LEN, ParseError, ParseOptions, Request};
use tracing::warn;

use crate::execute::{ServerContext, execute};
use crate::metrics::PROTOCOL_ERRORS;

/// Per-connection state for the cache server.
///
/// Owned by a single worker thread. Bytes read from the socket are appended
/// with [`append_recv_data`](Self::append_recv_data); [`process`](Self::process)
/// then dispatches every complete frame and queues the encoded responses.
pub struct Connection {
    read_buf: BytesMut,
    write_buf: BytesMut,
    write_pos: usize,
    /// Bytes of an oversized frame still to be dropped.
    discard: usize,
    options: ParseOptions,
}

impl Connection {
    pub fn new(read_buffer_size: usize, options: ParseOptions) -> Self {
        Self {
            read_buf: BytesMut::with_capacity(read_buffer_size),
            write_buf: BytesMut::with_capacity(65536),
            write_pos: 0,
            discard: 0,
            options,
        }
    }

    /// Append received data to the read buffer.
    #[inline]
    pub fn append_recv_data(&mut self, data: &[u8]) {
        let data = self.skip_discarded(data);
        if data.is_empty() {
            return;
        }
        // Compact when less than half of the buffer is in use.
        let cap = self.read_buf.capacity();
        if cap > 0 && self.read_buf.len() * 2 < cap {
            self.read_buf.reserve(data.len());
        }
        self.read_buf.extend_from_slice(data);
    }

    fn skip_discarded<'a>(&mut self, data: &'a [u8]) -> &'a [u8] {
        let n = self.discard.min(data.len());
        self.discard -= n;
        &data[n..]
    }

    /// Process all complete frames in the read buffer.
    pub fn process(&mut self, ctx: &ServerContext) {
        while !self.read_buf.is_empty() {
            match Request::parse_with_options(&self.read_buf, &self.options) {
                Ok((request, consumed)) => {
                    let response = execute(&request, ctx);
                    response.encode(&mut self.write_buf);
                    self.read_buf.advance(consumed);
                }
                Err(ParseError::Incomplete) => break,
                Err(ParseError::Malformed { consumed, source }) => {
                    PROTOCOL_ERRORS.increment();
                    warn!(error = %source, bytes = consumed, "skipping malformed frame");
                    self.read_buf.advance(consumed);
                }
                Err(ParseError::FrameTooLarge { len, max }) => {
                    PROTOCOL_ERRORS.increment();
                    warn!(len, max, "discarding oversized frame");
                    let total = HEADER_LEN + len;
                    let buffered = self.read_buf.len().min(total);
                    self.read_buf.advance(buffered);
                    self.discard = total - buffered;
                }
            }
        }
    }

    /// True while an oversized frame is still being dropped.
    #[inline]
    pub fn is_discarding(&self) -> bool {
        self.discard > 0
    }

    #[inline]
    pub fn has_pending_write(&self) -> bool {
        self.write_pos < self.write_buf.len()
    }

    #[inline]
    pub fn pending_write_len(&self) -> usize {
        self.write_buf.len() - self.write_pos
    }

    #[inline]
    pub fn pending_write_data(&self) -> &[u8] {
        &self.write_buf[self.write_pos..]
    }

    /// Mark `n` pending bytes as sent.
    ///
    /// The sent prefix is dropped once it makes up more than half of the
    /// write buffer, so memory stays proportional to unsent data.
    #[inline]
    pub fn advance_write(&mut self, n: usize) {
        self.write_pos += n;
        if self.write_pos >= self.write_buf.len() {
            self.write_buf.clear();
            self.write_pos = 0;
        } else if self.write_pos * 2 > self.write_buf.len() {
            self.write_buf.advance(self.write_pos);
            self.write_pos = 0;
        }
    }
}
