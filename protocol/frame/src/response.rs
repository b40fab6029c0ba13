//! Response messages: `Code, Result`.

use crate::error::{DecodeError, ParseError};
use crate::field::{FieldReader, HEADER_LEN, ParseOptions, field_len, put_field, split_frame};
use bytes::{Bytes, BytesMut};

/// Success.
pub const CODE_OK: &str = "200";
/// The request itself was unacceptable.
pub const CODE_BAD_REQUEST: &str = "400";
/// The request failed while being handled.
pub const CODE_ERROR: &str = "500";

/// A server response. `result` holds the payload on success and a
/// human-readable reason otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub code: String,
    pub result: Bytes,
}

impl Response {
    pub fn new(code: impl Into<String>, result: impl Into<Bytes>) -> Self {
        Self {
            code: code.into(),
            result: result.into(),
        }
    }

    /// `200` with the result `OK`.
    pub fn ok() -> Self {
        Self::new(CODE_OK, Bytes::from_static(b"OK"))
    }

    pub fn ok_with(result: impl Into<Bytes>) -> Self {
        Self::new(CODE_OK, result)
    }

    pub fn bad_request(reason: impl ToString) -> Self {
        Self::new(CODE_BAD_REQUEST, reason.to_string())
    }

    pub fn error(reason: impl ToString) -> Self {
        Self::new(CODE_ERROR, reason.to_string())
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }

    pub fn body_len(&self) -> usize {
        field_len(self.code.as_bytes()) + field_len(&self.result)
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.body_len()
    }

    /// Append the framed response to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        buf.extend_from_slice(&(self.body_len() as u32).to_be_bytes());
        put_field(buf, self.code.as_bytes());
        put_field(buf, &self.result);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decode a response body (no frame header). Trailing bytes are ignored.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = FieldReader::new(body);
        Ok(Self {
            code: reader.read_string("code")?,
            result: reader.read_payload("result")?,
        })
    }

    #[inline]
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        Self::parse_with_options(buf, &ParseOptions::default())
    }

    pub fn parse_with_options(
        buf: &[u8],
        options: &ParseOptions,
    ) -> Result<(Self, usize), ParseError> {
        let (body, consumed) = split_frame(buf, options)?;
        Self::decode(body)
            .map(|response| (response, consumed))
            .map_err(|source| ParseError::Malformed { consumed, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_layout() {
        let bytes = Response::ok().to_bytes();
        #[rustfmt::skip]
        let expected: &[u8] = &[
            0, 0, 0, 13,
            0, 0, 0, 3, b'2', b'0', b'0',
            0, 0, 0, 2, b'O', b'K',
        ];
        assert_eq!(&bytes[..], expected);
    }

    #[test]
    fn test_round_trip() {
        for response in [
            Response::ok(),
            Response::ok_with(&b"value1"[..]),
            Response::bad_request("unknown command: flush"),
            Response::error("key not found: missing"),
            Response::default(),
        ] {
            let bytes = response.to_bytes();
            assert_eq!(bytes.len(), response.encoded_len());
            let (parsed, consumed) = Response::parse(&bytes).unwrap();
            assert_eq!(consumed, bytes.len());
            assert_eq!(parsed, response);
        }
    }

    #[test]
    fn test_is_ok() {
        assert!(Response::ok().is_ok());
        assert!(Response::ok_with("x").is_ok());
        assert!(!Response::error("boom").is_ok());
        assert_eq!(Response::error("boom").code, "500");
        assert_eq!(Response::bad_request("bad").code, "400");
    }

    #[test]
    fn test_invalid_utf8_code() {
        let buf = [0, 0, 0, 9, 0, 0, 0, 1, 0xff, 0, 0, 0, 0];
        assert_eq!(
            Response::parse(&buf),
            Err(ParseError::Malformed {
                consumed: 13,
                source: DecodeError::InvalidUtf8 { field: "code" }
            })
        );
    }

    #[test]
    fn test_incomplete() {
        let bytes = Response::ok_with(&b"value"[..]).to_bytes();
        assert_eq!(
            Response::parse(&bytes[..bytes.len() - 1]),
            Err(ParseError::Incomplete)
        );
    }
}
