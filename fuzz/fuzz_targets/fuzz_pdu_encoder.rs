//! Fuzz target: `pdu::encode_message`
//!
//! Generates arbitrary `(country_code, local_number, reference, text)`
//! inputs and verifies the encoder either rejects the message cleanly
//! or produces frames that satisfy the protocol invariants:
//! - No panics under any input
//! - Single frame for ≤160 chars, ceil(len/153) frames above
//! - Every frame's user data length ≤ 160 septets
//! - Hex output has even length and a consistent transmit length
//!
//! cargo fuzz run fuzz_pdu_encoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use ratsentry::sms::pdu::{self, PhoneNumber};

fuzz_target!(|data: &[u8]| {
    if data.len() < 11 {
        return;
    }

    let cc = u16::from_le_bytes([data[0], data[1]]);
    let local = u64::from_le_bytes(data[2..10].try_into().unwrap());
    let reference = data[10];
    let text = String::from_utf8_lossy(&data[11..]);

    let dest = PhoneNumber::new(cc, local);
    let frames = match pdu::encode_message(&dest, &text, reference) {
        Ok(frames) => frames,
        Err(_) => return, // clean rejection is fine
    };

    let chars = text.chars().count();
    if chars <= 160 {
        assert_eq!(frames.len(), 1);
        assert!(frames[0].concat.is_none());
    } else {
        assert_eq!(frames.len(), chars.div_ceil(153));
    }

    for frame in &frames {
        assert!(frame.user_data_len <= 160, "UDL exceeds a frame's capacity");
        let hex = frame.to_hex().expect("encodable frame must assemble");
        assert_eq!(hex.len() % 2, 0, "hex output must be whole octets");
        assert_eq!(
            frame.transmit_length().expect("assembled frame has a length"),
            (hex.len() - 2) / 2
        );
    }
});
