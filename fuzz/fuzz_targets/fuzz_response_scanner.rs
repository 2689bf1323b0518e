//! Fuzz target: `ResponseScanner`
//!
//! Streams arbitrary chunkings of arbitrary bytes through the modem
//! response scanner and asserts it never panics, keeps matching after
//! buffer overflow, and stays quiet after `clear()`.
//!
//! cargo fuzz run fuzz_response_scanner

#![no_main]

use libfuzzer_sys::fuzz_target;
use ratsentry::sms::transport::ResponseScanner;

fuzz_target!(|data: &[u8]| {
    let mut scanner = ResponseScanner::new();

    // Feed in irregular chunk sizes derived from the data itself.
    let mut rest = data;
    while !rest.is_empty() {
        let take = (rest[0] as usize % 17) + 1;
        let take = take.min(rest.len());
        scanner.feed(&rest[..take]);

        // Queries must never panic, whatever the buffer contains.
        let _ = scanner.contains("OK");
        let _ = scanner.contains("ERROR");
        let _ = scanner.contains("+CMGS:");
        let _ = scanner.contains(">");

        rest = &rest[take..];
    }

    scanner.clear();
    assert!(!scanner.contains("OK"), "cleared scanner must not match");
});
