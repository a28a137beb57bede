//! Fuzz target for untrusted request input.
//!
//! Feeds arbitrary bytes to the `Authorization` header parser and arbitrary
//! strings to example-name validation. Neither may panic, and any header
//! that parses must survive a re-encode unchanged.
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_request_input -- -max_total_time=60
//! ```

#![no_main]

use gobo::middleware::Credentials;
use gobo::validation::validate_example_name;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Raw payload, and the same payload behind the expected scheme.
    let _ = Credentials::parse_basic(data);

    let mut header = b"Basic ".to_vec();
    header.extend_from_slice(data);
    if let Ok(parsed) = Credentials::parse_basic(&header) {
        let reparsed = Credentials::parse_basic(parsed.to_header_value().as_bytes());
        assert_eq!(reparsed.ok(), Some(parsed));
    }

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = validate_example_name(s);
    }
});
