#![no_main]
use libfuzzer_sys::fuzz_target;
use lockguard_hardware::protocol::{READ_RANGE, parse_range_response};

fuzz_target!(|data: &str| {
    match parse_range_response(data) {
        Ok(Some(_)) => {
            assert!(data.starts_with(READ_RANGE));
            assert!(data.contains(['\r', '\n']));
        }
        Ok(None) | Err(_) => {}
    }
});
