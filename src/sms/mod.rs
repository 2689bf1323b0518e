//! SMS alerting stack: GSM-7 text encoding, PDU frame construction,
//! and the AT-command transport that submits frames through the modem.
//!
//! Layering (leaves first): [`gsm7`] is pure bit manipulation, [`pdu`]
//! builds wire frames from it, [`transport`] drives the serial
//! handshake and owns the only code path that touches the modem UART.

pub mod gsm7;
pub mod pdu;
pub mod transport;
