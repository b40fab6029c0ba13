//! Length-prefixed binary request/response protocol.
//!
//! Every message travels as a frame: a 4-byte big-endian body length
//! followed by the body. A body is a fixed sequence of fields, each a 4-byte
//! big-endian length followed by that many bytes:
//!
//! - Request: `Command, Key, Value, Group`
//! - Response: `Code, Result`
//!
//! Absent fields are encoded with zero length, so every request carries all
//! four fields.
//!
//! # Example
//!
//! ```
//! use protocol_frame::{Request, Response};
//!
//! let bytes = Request::set("test", "key1", &b"value1"[..]).to_bytes();
//! let (request, consumed) = Request::parse(&bytes).unwrap();
//! assert_eq!(request.key, "key1");
//! assert_eq!(consumed, bytes.len());
//!
//! let bytes = Response::ok_with(&b"value1"[..]).to_bytes();
//! let (response, _) = Response::parse(&bytes).unwrap();
//! assert!(response.is_ok());
//! ```

mod command;
mod error;
mod field;
mod request;
mod response;

pub use command::Command;
pub use error::{DecodeError, ParseError};
pub use field::{DEFAULT_MAX_FRAME_LEN, HEADER_LEN, ParseOptions};
pub use request::Request;
pub use response::{CODE_BAD_REQUEST, CODE_ERROR, CODE_OK, Response};
