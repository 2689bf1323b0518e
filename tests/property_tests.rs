//! Property tests for the SMS protocol core.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32
//! targets.  On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;

use ratsentry::sms::gsm7::{self, char_for};
use ratsentry::sms::pdu::{self, PhoneNumber};

/// Any valid GSM-7 septet except the escape prefix.
fn septet_strategy() -> impl Strategy<Value = u8> {
    (0u8..=0x7F).prop_filter("escape prefix is not a character", |s| *s != 0x1B)
}

/// Text made only of GSM-7-expressible characters.
fn gsm7_text(max_len: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(septet_strategy(), 0..=max_len)
        .prop_map(|septets| septets.into_iter().filter_map(char_for).collect())
}

proptest! {
    /// Packing then unpacking recovers the exact septet sequence for
    /// every length up to 200 and any fill-bit offset in use.
    #[test]
    fn septet_packing_round_trips(
        septets in proptest::collection::vec(0u8..=0x7F, 0..=200),
        fill in 0u8..=1,
    ) {
        let packed = gsm7::pack_septets(&septets, fill).unwrap();
        let unpacked = gsm7::unpack_septets(&packed, fill, septets.len());
        prop_assert_eq!(&unpacked[..], &septets[..]);
    }

    /// 8 septets fit 7 octets: packed size is always ceil((7n+fill)/8).
    #[test]
    fn packed_length_is_exact(
        septets in proptest::collection::vec(0u8..=0x7F, 0..=200),
        fill in 0u8..=1,
    ) {
        let packed = gsm7::pack_septets(&septets, fill).unwrap();
        let bits = septets.len() * 7 + fill as usize;
        prop_assert_eq!(packed.len(), bits.div_ceil(8));
    }

    /// Short texts travel as exactly one frame whose user data length
    /// equals the character count.
    #[test]
    fn single_part_udl_equals_char_count(text in gsm7_text(160)) {
        let dest = PhoneNumber::new(65, 91_234_567);
        let frames = pdu::encode_message(&dest, &text, 0x42).unwrap();
        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(frames[0].user_data_len as usize, text.chars().count());
        prop_assert!(frames[0].concat.is_none());
    }

    /// Long texts split into ceil(len/153) parts sharing one reference
    /// with 1-based strictly increasing sequence numbers.
    #[test]
    fn splitting_preserves_structure(text in gsm7_text(1000), reference in any::<u8>()) {
        let chars = text.chars().count();
        prop_assume!(chars > 160);

        let dest = PhoneNumber::new(65, 91_234_567);
        let frames = pdu::encode_message(&dest, &text, reference).unwrap();

        let expected = chars.div_ceil(153);
        prop_assert_eq!(frames.len(), expected);

        for (i, frame) in frames.iter().enumerate() {
            let c = frame.concat.expect("every part carries a concat header");
            prop_assert_eq!(c.reference, reference);
            prop_assert_eq!(c.total as usize, expected);
            prop_assert_eq!(c.seq as usize, i + 1);
            // 153 chars of text + 7 septets of header, less on the tail.
            prop_assert!(frame.user_data_len <= 160);
        }
    }

    /// The announced transmit length is consistent with the assembled
    /// hex frame for any message.
    #[test]
    fn transmit_length_matches_hex(text in gsm7_text(400)) {
        let dest = PhoneNumber::new(44, 7_700_900_123);
        for frame in pdu::encode_message(&dest, &text, 7).unwrap() {
            let hex = frame.to_hex().unwrap();
            prop_assert_eq!(hex.len() % 2, 0);
            prop_assert_eq!(frame.transmit_length().unwrap(), (hex.len() - 2) / 2);
        }
    }

    /// Destination encoding: length nibble counts digits, type byte is
    /// international, and the digit payload is a nibble-swap involution.
    #[test]
    fn destination_encoding_structure(cc in 1u16..=999, local in 1u64..=999_999_999_999) {
        let n = PhoneNumber::new(cc, local);
        let enc = pdu::encode_destination(&n).unwrap();
        let digits = n.digits();

        let count = u8::from_str_radix(&enc[0..2], 16).unwrap() as usize;
        prop_assert_eq!(count, digits.len());
        prop_assert_eq!(&enc[2..4], "91");

        // Undo the nibble swap and recover the original digits.
        let swapped = &enc[4..];
        let mut recovered = String::new();
        for pair in swapped.as_bytes().chunks_exact(2) {
            recovered.push(pair[1] as char);
            recovered.push(pair[0] as char);
        }
        let recovered = recovered.trim_end_matches('F');
        prop_assert_eq!(recovered, digits.as_str());
    }
}
