//! SMS-SUBMIT PDU construction (GSM 03.40 PDU mode).
//!
//! Wire layout of one hex-encoded frame, as handed to `AT+CMGS`:
//!
//! ```text
//! ┌──────┬────────┬──────┬───────────────┬─────┬─────┬─────┬───────┬──────────┐
//! │ SMSC │ header │ mref │ destination   │ PID │ DCS │ UDL │ [UDH] │ user data│
//! │ "00" │  1 B   │ 1 B  │ len+type+BCD  │ 1 B │ 1 B │ 1 B │  6 B  │ packed   │
//! └──────┴────────┴──────┴───────────────┴─────┴─────┴─────┴───────┴──────────┘
//! ```
//!
//! SMSC length 0 tells the modem to use its stored service centre.  The
//! byte count announced in `AT+CMGS=<n>` therefore excludes that first
//! octet: `n = (hex_len - 2) / 2`.
//!
//! Splitting policy: up to 160 GSM-7 characters travel as one SUBMIT
//! frame; longer texts are chunked into 153-character parts, each
//! carrying a `05 00 03 <ref> <total> <seq>` concatenation header and
//! one fill bit of septet padding.  All parts of one message share a
//! single 8-bit reference; more than 255 parts is an error.

use serde::{Deserialize, Serialize};

use crate::error::EncodeError;
use crate::sms::gsm7;

/// Longest text that still fits a single frame.
pub const SINGLE_PART_MAX_CHARS: usize = 160;

/// Characters per part once a concatenation header eats 7 septets.
pub const MULTI_PART_CHARS: usize = 153;

/// Concatenation cap imposed by the 8-bit "total parts" field.
pub const MAX_PARTS: usize = 255;

/// First PDU octet for a plain SMS-SUBMIT (MTI=01, no validity period).
const HEADER_SUBMIT: u8 = 0x01;

/// SMS-SUBMIT with the UDHI bit set (user data starts with a header).
const HEADER_SUBMIT_UDH: u8 = 0x41;

/// Type-of-address octet: international number, ISDN plan.
const TON_INTERNATIONAL: u8 = 0x91;

/// Hex capacity for an encoded destination (2+2 prefix + up to 26 digit
/// nibbles for a 5-digit country code and 20-digit subscriber part).
const DEST_HEX_CAP: usize = 32;

/// Hex capacity for one whole frame.
const PDU_HEX_CAP: usize = 352;

// ── Phone numbers ─────────────────────────────────────────────

/// An international destination: country code + subscriber number.
///
/// The canonical text form is `+<cc><subscriber>`; the wire form is the
/// semi-octet encoding produced by [`encode_destination`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub country_code: u16,
    pub local_number: u64,
}

impl PhoneNumber {
    pub const fn new(country_code: u16, local_number: u64) -> Self {
        Self {
            country_code,
            local_number,
        }
    }

    /// All digits, country code first, no `+`.
    pub fn digits(&self) -> heapless::String<26> {
        let mut s = heapless::String::new();
        // A u16 country code and u64 subscriber can never exceed the
        // 26-byte capacity (5 + 20 digits).
        let _ = core::fmt::Write::write_fmt(
            &mut s,
            format_args!("{}{}", self.country_code, self.local_number),
        );
        s
    }
}

impl core::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "+{}{}", self.country_code, self.local_number)
    }
}

// ── Encoded frame ─────────────────────────────────────────────

/// Concatenation bookkeeping carried by each part of a multi-part send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcatInfo {
    /// Reference shared by every part of one logical message.
    pub reference: u8,
    /// Total number of parts.
    pub total: u8,
    /// 1-based part number.
    pub seq: u8,
}

/// One ready-to-transmit SMS-SUBMIT frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduMessage {
    /// First PDU octet (SUBMIT, optionally with UDHI).
    pub header: u8,
    /// TP-MR; 0 lets the modem assign its own reference.
    pub message_ref: u8,
    /// Semi-octet destination, hex (`<len><0x91><swapped digits>`).
    pub dest: heapless::String<DEST_HEX_CAP>,
    /// TP-PID; 0 = plain SME-to-SME.
    pub protocol_id: u8,
    /// TP-DCS; 0 = GSM-7 default alphabet, no class.
    pub data_coding: u8,
    /// TP-UDL in septets (includes the UDH contribution when present).
    pub user_data_len: u8,
    /// Packed user data as hex (UDH excluded; see [`ConcatInfo`]).
    pub user_data: heapless::String<288>,
    /// Present on parts of a concatenated message.
    pub concat: Option<ConcatInfo>,
}

impl PduMessage {
    /// Assemble the full hex string, SMSC field included.
    pub fn to_hex(&self) -> Result<heapless::String<PDU_HEX_CAP>, EncodeError> {
        let mut out = heapless::String::new();
        push_hex(&mut out, 0x00)?; // SMSC: use modem default
        push_hex(&mut out, self.header)?;
        push_hex(&mut out, self.message_ref)?;
        out.push_str(self.dest.as_str())
            .map_err(|()| EncodeError::BufferOverflow)?;
        push_hex(&mut out, self.protocol_id)?;
        push_hex(&mut out, self.data_coding)?;
        push_hex(&mut out, self.user_data_len)?;
        if let Some(c) = self.concat {
            for b in [0x05, 0x00, 0x03, c.reference, c.total, c.seq] {
                push_hex(&mut out, b)?;
            }
        }
        out.push_str(self.user_data.as_str())
            .map_err(|()| EncodeError::BufferOverflow)?;
        Ok(out)
    }

    /// Byte count for `AT+CMGS=<n>`: everything except the SMSC octet.
    pub fn transmit_length(&self) -> Result<usize, EncodeError> {
        Ok((self.to_hex()?.len() - 2) / 2)
    }
}

// ── Destination encoding ──────────────────────────────────────

/// Semi-octet ("reverse nibble") destination encoding.
///
/// Digit count, then 0x91, then digit pairs nibble-swapped; an odd
/// count is padded with 0xF, e.g. `+6591234567` → `0A915619325476`.
pub fn encode_destination(
    number: &PhoneNumber,
) -> Result<heapless::String<DEST_HEX_CAP>, EncodeError> {
    let digits = number.digits();
    let bytes = digits.as_bytes();

    let mut out = heapless::String::new();
    push_hex(&mut out, bytes.len() as u8)?;
    push_hex(&mut out, TON_INTERNATIONAL)?;

    let mut i = 0;
    while i < bytes.len() {
        let lo = bytes[i];
        let hi = if i + 1 < bytes.len() { bytes[i + 1] } else { b'F' };
        // Swapped pair: second digit first.
        out.push(hi as char)
            .and_then(|()| out.push(lo as char))
            .map_err(|()| EncodeError::BufferOverflow)?;
        i += 2;
    }

    Ok(out)
}

// ── Message encoding ──────────────────────────────────────────

/// Encode `text` for `dest` into one or more transmit-ready frames.
///
/// `concat_ref` is only used when the text does not fit a single frame;
/// the caller supplies a fresh random reference per logical message.
pub fn encode_message(
    dest: &PhoneNumber,
    text: &str,
    concat_ref: u8,
) -> Result<Vec<PduMessage>, EncodeError> {
    // Translate up front: one bad character kills the whole message
    // before anything is framed.
    let septets = gsm7::encode_text(text)?;
    let dest_hex = encode_destination(dest)?;

    if septets.len() <= SINGLE_PART_MAX_CHARS {
        return Ok(vec![encode_single(dest_hex, &septets)?]);
    }

    let total = septets.len().div_ceil(MULTI_PART_CHARS);
    if total > MAX_PARTS {
        return Err(EncodeError::TooManyParts);
    }

    let mut frames = Vec::with_capacity(total);
    for (idx, chunk) in septets.chunks(MULTI_PART_CHARS).enumerate() {
        frames.push(encode_part(
            dest_hex.clone(),
            chunk,
            ConcatInfo {
                reference: concat_ref,
                total: total as u8,
                seq: (idx + 1) as u8,
            },
        )?);
    }
    Ok(frames)
}

fn encode_single(
    dest: heapless::String<DEST_HEX_CAP>,
    septets: &[u8],
) -> Result<PduMessage, EncodeError> {
    let packed = gsm7::pack_septets(septets, 0)?;
    Ok(PduMessage {
        header: HEADER_SUBMIT,
        message_ref: 0x00,
        dest,
        protocol_id: 0x00,
        data_coding: 0x00,
        user_data_len: septets.len() as u8,
        user_data: hex_string(&packed)?,
        concat: None,
    })
}

fn encode_part(
    dest: heapless::String<DEST_HEX_CAP>,
    septets: &[u8],
    concat: ConcatInfo,
) -> Result<PduMessage, EncodeError> {
    // One fill bit aligns the text after the 48-bit header; the header
    // plus fill count as 7 septets in TP-UDL.
    let packed = gsm7::pack_septets(septets, 1)?;
    Ok(PduMessage {
        header: HEADER_SUBMIT_UDH,
        message_ref: 0x00,
        dest,
        protocol_id: 0x00,
        data_coding: 0x00,
        user_data_len: (septets.len() + 7) as u8,
        user_data: hex_string(&packed)?,
        concat: Some(concat),
    })
}

// ── Hex helpers ───────────────────────────────────────────────

const HEX: &[u8; 16] = b"0123456789ABCDEF";

fn push_hex<const N: usize>(
    out: &mut heapless::String<N>,
    byte: u8,
) -> Result<(), EncodeError> {
    out.push(HEX[(byte >> 4) as usize] as char)
        .and_then(|()| out.push(HEX[(byte & 0x0F) as usize] as char))
        .map_err(|()| EncodeError::BufferOverflow)
}

fn hex_string(bytes: &[u8]) -> Result<heapless::String<288>, EncodeError> {
    let mut out = heapless::String::new();
    for &b in bytes {
        push_hex(&mut out, b)?;
    }
    Ok(out)
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn test_number() -> PhoneNumber {
        PhoneNumber::new(65, 91_234_567)
    }

    #[test]
    fn destination_reverse_nibble_vector() {
        // 10 digits → 0x0A, international type, swapped pairs.
        let enc = encode_destination(&test_number()).unwrap();
        assert_eq!(enc.as_str(), "0A915619325476");
    }

    #[test]
    fn destination_odd_digit_count_pads_with_f() {
        let n = PhoneNumber::new(44, 7_700_900);
        // digits "447700900" → 9 digits, trailing F pad.
        let enc = encode_destination(&n).unwrap();
        assert_eq!(enc.as_str(), "099144770009F0");
    }

    #[test]
    fn single_part_frame_layout() {
        let frames = encode_message(&test_number(), "Hi", 0x2A).unwrap();
        assert_eq!(frames.len(), 1);
        let f = &frames[0];
        assert_eq!(f.header, 0x01);
        assert_eq!(f.user_data_len, 2);
        assert!(f.concat.is_none());
        assert_eq!(
            f.to_hex().unwrap().as_str(),
            "0001000A915619325476000002C834"
        );
        assert_eq!(f.transmit_length().unwrap(), 14);
    }

    #[test]
    fn udl_equals_char_count_for_short_texts() {
        for len in [0usize, 1, 42, 159, 160] {
            let text: String = core::iter::repeat_n('a', len).collect();
            let frames = encode_message(&test_number(), &text, 0).unwrap();
            assert_eq!(frames.len(), 1, "len {len} must stay single-part");
            assert_eq!(frames[0].user_data_len as usize, len);
        }
    }

    #[test]
    fn long_text_splits_into_153_char_parts() {
        let text: String = core::iter::repeat_n('x', 400).collect();
        let frames = encode_message(&test_number(), &text, 0x77).unwrap();
        assert_eq!(frames.len(), 3); // ceil(400 / 153)

        for (i, f) in frames.iter().enumerate() {
            assert_eq!(f.header, 0x41);
            let c = f.concat.expect("every part carries a concat header");
            assert_eq!(c.reference, 0x77);
            assert_eq!(c.total, 3);
            assert_eq!(c.seq, (i + 1) as u8);
        }
        assert_eq!(frames[0].user_data_len, 160); // 153 text + 7 header
        assert_eq!(frames[2].user_data_len as usize, 400 - 2 * 153 + 7);
    }

    #[test]
    fn part_hex_carries_udh_prefix() {
        let text: String = core::iter::repeat_n('x', 200).collect();
        let frames = encode_message(&test_number(), &text, 0xAB).unwrap();
        let hex = frames[0].to_hex().unwrap();
        // ...UDL(A0) then 05 00 03 AB 02 01.
        assert!(hex.as_str().contains("A0050003AB0201"));
    }

    #[test]
    fn boundary_161_chars_becomes_two_parts() {
        let text: String = core::iter::repeat_n('y', 161).collect();
        let frames = encode_message(&test_number(), &text, 1).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].user_data_len, 160);
        assert_eq!(frames[1].user_data_len, 161 - 153 + 7);
    }

    #[test]
    fn oversize_message_is_rejected() {
        // 255 * 153 = 39015 chars is the ceiling; one more must fail.
        let text: String = core::iter::repeat_n('z', 255 * 153 + 1).collect();
        assert_eq!(
            encode_message(&test_number(), &text, 0).unwrap_err(),
            EncodeError::TooManyParts
        );
    }

    #[test]
    fn unmappable_character_is_fatal_before_framing() {
        let err = encode_message(&test_number(), "price: 5€", 0).unwrap_err();
        assert_eq!(err, EncodeError::UnmappableChar('€'));
    }

    #[test]
    fn transmit_length_excludes_smsc_octet() {
        let frames = encode_message(&test_number(), "hellohello", 0).unwrap();
        let hex = frames[0].to_hex().unwrap();
        assert_eq!(frames[0].transmit_length().unwrap(), (hex.len() - 2) / 2);
    }
}
