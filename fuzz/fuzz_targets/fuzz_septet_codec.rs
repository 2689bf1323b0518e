//! Fuzz target: GSM-7 septet packing round trip
//!
//! Packs arbitrary septet sequences (masked to 7 bits) with both fill
//! offsets and asserts the unpacker recovers them exactly — the same
//! invariant the property tests check, but driven by the fuzzer's
//! corpus instead of proptest's generator.
//!
//! cargo fuzz run fuzz_septet_codec

#![no_main]

use libfuzzer_sys::fuzz_target;
use ratsentry::sms::gsm7;

fuzz_target!(|data: &[u8]| {
    // Cap at the packer's documented input bound.
    let septets: Vec<u8> = data.iter().take(200).map(|b| b & 0x7F).collect();

    for fill in [0u8, 1] {
        let packed = match gsm7::pack_septets(&septets, fill) {
            Ok(p) => p,
            Err(_) => return, // bounded-buffer rejection is clean
        };
        let unpacked = gsm7::unpack_septets(&packed, fill, septets.len());
        assert_eq!(&unpacked[..], &septets[..], "round trip must be exact");
    }
});
