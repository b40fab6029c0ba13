#![no_main]

use libfuzzer_sys::fuzz_target;
use protocol_frame::Response;

fuzz_target!(|data: &[u8]| {
    if let Ok((response, consumed)) = Response::parse(data) {
        assert!(consumed <= data.len());
        let _ = response.is_ok();

        let encoded = response.to_bytes();
        let (reparsed, _) = Response::parse(&encoded).unwrap();
        assert_eq!(response, reparsed);
    }
});
