#![no_main]

use libfuzzer_sys::fuzz_target;
use protocol_frame::{ParseError, ParseOptions, Request};

fuzz_target!(|data: &[u8]| {
    let options = ParseOptions::new().max_frame_len(64 * 1024);
    match Request::parse_with_options(data, &options) {
        Ok((request, consumed)) => {
            assert!(consumed <= data.len());
            assert!(consumed >= 20);

            // Re-encoding drops trailing body bytes, so it can only shrink
            let encoded = request.to_bytes();
            assert!(encoded.len() <= consumed);
            let (reparsed, n) = Request::parse(&encoded).unwrap();
            assert_eq!(n, encoded.len());
            assert_eq!(request, reparsed);
        }
        Err(ParseError::Malformed { consumed, .. }) => {
            assert!(consumed <= data.len());
        }
        Err(_) => {
            // Incomplete and oversized frames are expected for arbitrary input
        }
    }
});
