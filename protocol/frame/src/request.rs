//! Request messages: `Command, Key, Value, Group`.

use crate::command::Command;
use crate::error::{DecodeError, ParseError};
use crate::field::{FieldReader, HEADER_LEN, ParseOptions, field_len, put_field, split_frame};
use bytes::{Bytes, BytesMut};

/// A client request.
///
/// All four fields are always encoded; absent values are zero-length. The
/// command is kept as text so that unrecognized names survive decoding and
/// can be reported back to the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub command: String,
    pub key: String,
    pub value: Bytes,
    pub group: String,
}

impl Request {
    pub fn new(
        command: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Bytes>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            key: key.into(),
            value: value.into(),
            group: group.into(),
        }
    }

    pub fn set(group: &str, key: &str, value: impl Into<Bytes>) -> Self {
        Self::new(Command::Set.as_str(), key, value, group)
    }

    pub fn get(group: &str, key: &str) -> Self {
        Self::new(Command::Get.as_str(), key, Bytes::new(), group)
    }

    pub fn del(group: &str, key: &str) -> Self {
        Self::new(Command::Del.as_str(), key, Bytes::new(), group)
    }

    /// Create a group of `capacity_mb` mebibytes.
    pub fn new_group(group: &str, capacity_mb: u64) -> Self {
        Self::new(
            Command::NewGroup.as_str(),
            capacity_mb.to_string(),
            Bytes::new(),
            group,
        )
    }

    pub fn del_group(group: &str) -> Self {
        Self::new(Command::DelGroup.as_str(), "", Bytes::new(), group)
    }

    pub fn list_group() -> Self {
        Self::new(Command::ListGroup.as_str(), "", Bytes::new(), "")
    }

    pub fn keys(group: &str) -> Self {
        Self::new(Command::Keys.as_str(), "", Bytes::new(), group)
    }

    pub fn stats(group: &str) -> Self {
        Self::new(Command::Stats.as_str(), "", Bytes::new(), group)
    }

    pub fn locate(key: &str) -> Self {
        Self::new(Command::Locate.as_str(), key, Bytes::new(), "")
    }

    /// The recognized command, if any.
    pub fn kind(&self) -> Option<Command> {
        Command::parse(&self.command)
    }

    /// Body length in bytes, excluding the frame header.
    pub fn body_len(&self) -> usize {
        field_len(self.command.as_bytes())
            + field_len(self.key.as_bytes())
            + field_len(&self.value)
            + field_len(self.group.as_bytes())
    }

    /// Full frame length in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.body_len()
    }

    /// Append the framed request to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        put_field(buf, &[]);
        let header_at = buf.len() - HEADER_LEN;
        put_field(buf, self.command.as_bytes());
        put_field(buf, self.key.as_bytes());
        put_field(buf, &self.value);
        put_field(buf, self.group.as_bytes());
        let body_len = (buf.len() - header_at - HEADER_LEN) as u32;
        buf[header_at..header_at + HEADER_LEN].copy_from_slice(&body_len.to_be_bytes());
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decode a request body (no frame header). Trailing bytes after the
    /// group field are ignored.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = FieldReader::new(body);
        Ok(Self {
            command: reader.read_string("command")?,
            key: reader.read_string("key")?,
            value: reader.read_payload("value")?,
            group: reader.read_string("group")?,
        })
    }

    /// Parse one framed request from the front of `buf` using default limits.
    ///
    /// Returns the request and the number of bytes consumed.
    #[inline]
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        Self::parse_with_options(buf, &ParseOptions::default())
    }

    pub fn parse_with_options(
        buf: &[u8],
        options: &ParseOptions,
    ) -> Result<(Self, usize), ParseError> {
        let (body, consumed) = split_frame(buf, options)?;
        match Self::decode(body) {
            Ok(request) => Ok((request, consumed)),
            Err(source) => Err(ParseError::Malformed { consumed, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        let bytes = Request::get("g", "k").to_bytes();
        #[rustfmt::skip]
        let expected: &[u8] = &[
            0, 0, 0, 21,
            0, 0, 0, 3, b'g', b'e', b't',
            0, 0, 0, 1, b'k',
            0, 0, 0, 0,
            0, 0, 0, 1, b'g',
        ];
        assert_eq!(&bytes[..], expected);
        assert_eq!(Request::get("g", "k").encoded_len(), expected.len());
    }

    #[test]
    fn test_parse_round_trip() {
        let request = Request::set("test", "key1", &b"value1"[..]);
        let bytes = request.to_bytes();
        let (parsed, consumed) = Request::parse(&bytes).unwrap();
        assert_eq!(parsed, request);
        assert_eq!(consumed, bytes.len());
        assert_eq!(parsed.kind(), Some(Command::Set));
    }

    #[test]
    fn test_empty_fields_round_trip() {
        let request = Request::default();
        let bytes = request.to_bytes();
        assert_eq!(bytes.len(), 20);
        assert_eq!(Request::parse(&bytes).unwrap().0, request);
    }

    #[test]
    fn test_parse_two_frames() {
        let mut buf = BytesMut::new();
        Request::set("g", "a", &b"1"[..]).encode(&mut buf);
        Request::get("g", "a").encode(&mut buf);

        let (first, n) = Request::parse(&buf).unwrap();
        assert_eq!(first.kind(), Some(Command::Set));
        let (second, m) = Request::parse(&buf[n..]).unwrap();
        assert_eq!(second.kind(), Some(Command::Get));
        assert_eq!(n + m, buf.len());
    }

    #[test]
    fn test_parse_incomplete_at_every_split() {
        let bytes = Request::set("group", "key", &b"value"[..]).to_bytes();
        for end in 0..bytes.len() {
            assert_eq!(Request::parse(&bytes[..end]), Err(ParseError::Incomplete));
        }
    }

    #[test]
    fn test_parse_malformed_reports_consumed() {
        // body declares 6 bytes but the command field claims 10
        let buf = [0, 0, 0, 6, 0, 0, 0, 10, b'a', b'b', 0xaa];
        let err = Request::parse(&buf).unwrap_err();
        assert_eq!(
            err,
            ParseError::Malformed {
                consumed: 10,
                source: DecodeError::Truncated {
                    field: "command",
                    len: 10,
                    remaining: 2
                }
            }
        );
    }

    #[test]
    fn test_decode_missing_field() {
        let mut buf = BytesMut::new();
        put_field(&mut buf, b"get");
        put_field(&mut buf, b"k");
        assert_eq!(
            Request::decode(&buf),
            Err(DecodeError::MalformedLength { field: "value" })
        );
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let request = Request::del("g", "k");
        let bytes = request.to_bytes();
        let mut body = bytes[HEADER_LEN..].to_vec();
        body.extend_from_slice(b"junk");
        assert_eq!(Request::decode(&body).unwrap(), request);
    }

    #[test]
    fn test_unknown_command_survives_decode() {
        let request = Request::new("flush", "", Bytes::new(), "");
        let (parsed, _) = Request::parse(&request.to_bytes()).unwrap();
        assert_eq!(parsed.command, "flush");
        assert_eq!(parsed.kind(), None);
    }

    #[test]
    fn test_new_group_capacity_in_key() {
        let request = Request::new_group("test", 100);
        assert_eq!(request.key, "100");
        assert_eq!(request.group, "test");
        assert_eq!(request.kind(), Some(Command::NewGroup));
    }

    #[test]
    fn test_frame_too_large() {
        let bytes = Request::set("g", "k", vec![0u8; 64]).to_bytes();
        let options = ParseOptions::new().max_frame_len(32);
        assert!(matches!(
            Request::parse_with_options(&bytes, &options),
            Err(ParseError::FrameTooLarge { max: 32, .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            command in ".{0,12}",
            key in ".{0,32}",
            value in prop::collection::vec(any::<u8>(), 0..256),
            group in ".{0,16}",
        ) {
            let request = Request::new(command, key, value, group);
            let bytes = request.to_bytes();
            prop_assert_eq!(bytes.len(), request.encoded_len());
            let (parsed, consumed) = Request::parse(&bytes).unwrap();
            prop_assert_eq!(consumed, bytes.len());
            prop_assert_eq!(parsed.to_bytes(), bytes);
            prop_assert_eq!(parsed, request);
        }
    }
}
