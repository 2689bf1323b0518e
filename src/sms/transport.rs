//! GSM modem SMS transport — the AT-command handshake.
//!
//! Per send, the handshake walks a fixed stage sequence over one
//! exclusively-owned serial link:
//!
//! ```text
//! Closed ──open──▶ Open ──AT+CMGF=0──▶ PduMode ─┐
//!        settle             "OK"                │ per frame
//!    ┌───────────────────────────────────────── ┘
//!    │  AT+CMGS=<n>   ──▶  ">"
//!    │  <hex PDU> ^Z  ──▶  "+CMGS:"
//!    └──────────────── next frame … ──▶ Close
//! ```
//!
//! Any `ERROR` response aborts the remaining frames of a multi-part
//! send immediately; parts already accepted by the network are neither
//! retried nor withdrawn — the recipient may see a truncated
//! concatenated message, which is normal gateway behaviour.
//!
//! Every stage waits for its terminator token under an explicit
//! deadline; a silent modem surfaces as [`ModemError::Timeout`] instead
//! of blocking the queue consumer forever.

use core::fmt::Write as _;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{Error, ModemError, Result, TxStage};
use crate::queue::CancelToken;
use crate::sms::pdu::{self, PduMessage, PhoneNumber};

/// Ctrl-Z terminates the hex payload after `AT+CMGS`.
const CTRL_Z: u8 = 0x1A;

/// Serial read granularity while waiting for a response token.
const READ_POLL_MS: u32 = 50;

// ── Serial link port ──────────────────────────────────────────

/// Byte-oriented serial channel to the modem.
///
/// Concrete implementations:
/// - UART1 via ESP-IDF driver (production)
/// - scripted in-memory link (tests)
///
/// The transport is generic over `SerialLink`, so swapping the physical
/// layer requires zero changes to the handshake logic.
pub trait SerialLink {
    /// Error type for this link.
    type Error: core::fmt::Debug;

    /// Open / claim the port.
    fn open(&mut self) -> core::result::Result<(), Self::Error>;

    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> core::result::Result<(), Self::Error>;

    /// Read up to `buf.len()` bytes, blocking at most `timeout_ms`.
    /// Returns 0 if nothing arrived.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32)
        -> core::result::Result<usize, Self::Error>;

    /// Release the port.
    fn close(&mut self);
}

// ── Response scanning ─────────────────────────────────────────

/// Accumulates response bytes and answers substring queries.
///
/// The `>` prompt arrives without a line terminator, so matching works
/// on the raw accumulated bytes rather than parsed lines.  On overflow
/// the oldest half is discarded — a token split across the discard
/// boundary is unrecoverable anyway at that point.
pub struct ResponseScanner {
    buf: heapless::Vec<u8, 256>,
}

impl ResponseScanner {
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
        }
    }

    pub fn feed(&mut self, data: &[u8]) {
        for &b in data {
            if self.buf.push(b).is_err() {
                let half = self.buf.len() / 2;
                let tail: heapless::Vec<u8, 256> =
                    heapless::Vec::from_slice(&self.buf[half..]).unwrap_or_default();
                self.buf = tail;
                let _ = self.buf.push(b);
            }
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        let n = needle.as_bytes();
        if n.is_empty() || self.buf.len() < n.len() {
            return needle.is_empty();
        }
        self.buf.windows(n.len()).any(|w| w == n)
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

// ── Transport configuration ───────────────────────────────────

/// Knobs for one modem transport instance.  `trace` is a per-instance
/// field, not a process-wide toggle.
#[derive(Debug, Clone, Copy)]
pub struct ModemConfig {
    pub settle_delay_ms: u32,
    pub response_timeout_ms: u32,
    pub trace: bool,
}

impl From<&crate::config::SmsConfig> for ModemConfig {
    fn from(cfg: &crate::config::SmsConfig) -> Self {
        Self {
            settle_delay_ms: cfg.settle_delay_ms,
            response_timeout_ms: cfg.response_timeout_ms,
            trace: cfg.trace,
        }
    }
}

// ── Transport ─────────────────────────────────────────────────

/// Drives PDU-mode submission over a [`SerialLink`].
///
/// Exactly one queue consumer owns each instance, so calls never
/// overlap on the port.
pub struct ModemSmsTransport<L: SerialLink> {
    link: L,
    cfg: ModemConfig,
}

impl<L: SerialLink> ModemSmsTransport<L> {
    pub fn new(link: L, cfg: ModemConfig) -> Self {
        Self { link, cfg }
    }

    /// Send `text` to one destination, splitting into concatenated
    /// frames as needed.  Encoding failures abort before the port is
    /// touched.
    pub fn send(&mut self, dest: &PhoneNumber, text: &str, cancel: &CancelToken) -> Result<()> {
        let frames = pdu::encode_message(dest, text, random_concat_ref())?;
        info!("modem: {} frame(s) for {}", frames.len(), dest);

        if let Err(e) = self.link.open() {
            warn!("modem: open failed: {e:?}");
            return Err(ModemError::Link.into());
        }
        std::thread::sleep(Duration::from_millis(u64::from(self.cfg.settle_delay_ms)));

        let result = self.submit_frames(&frames, cancel);
        self.link.close();

        if let Err(e) = result {
            warn!("modem: send to {} aborted: {e}", dest);
            return Err(e);
        }
        Ok(())
    }

    /// Send the same text to every recipient, one handshake each.
    ///
    /// A failed recipient is logged and the rest still get their alert;
    /// the last failure is reported so the queue consumer records it.
    pub fn send_to_all(
        &mut self,
        recipients: &[PhoneNumber],
        text: &str,
        cancel: &CancelToken,
    ) -> Result<()> {
        let mut last_err = None;
        for dest in recipients {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if let Err(e) = self.send(dest, text, cancel) {
                last_err = Some(e);
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn submit_frames(&mut self, frames: &[PduMessage], cancel: &CancelToken) -> Result<()> {
        self.command(b"AT+CMGF=0\r\n", "OK", TxStage::SetPduMode)?;

        for frame in frames {
            // Cooperative checkpoint between frames; an in-flight AT
            // transaction is never interrupted.
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let mut cmd: heapless::String<24> = heapless::String::new();
            // Buffer fits "AT+CMGS=" plus any usize and CRLF.
            let _ = write!(cmd, "AT+CMGS={}\r\n", frame.transmit_length()?);
            self.command(cmd.as_bytes(), ">", TxStage::SetSize)?;

            let hex = frame.to_hex()?;
            if self.cfg.trace {
                debug!("modem >> {}", hex.as_str());
            }
            self.write_all(hex.as_bytes())?;
            self.write_all(&[CTRL_Z])?;
            self.wait_for("+CMGS:", TxStage::SendContent)?;
        }
        Ok(())
    }

    fn command(&mut self, tx: &[u8], expect: &str, stage: TxStage) -> Result<()> {
        if self.cfg.trace {
            debug!("modem >> {}", String::from_utf8_lossy(tx).trim_end());
        }
        self.write_all(tx)?;
        self.wait_for(expect, stage)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.link.write(data).map_err(|e| {
            warn!("modem: write failed: {e:?}");
            Error::Modem(ModemError::Link)
        })
    }

    /// Block until the response contains `expect`, an `ERROR`, or the
    /// configured deadline passes.
    fn wait_for(&mut self, expect: &str, stage: TxStage) -> Result<()> {
        let deadline = Instant::now()
            + Duration::from_millis(u64::from(self.cfg.response_timeout_ms));
        let mut scanner = ResponseScanner::new();
        let mut chunk = [0u8; 64];

        loop {
            let n = self
                .link
                .read(&mut chunk, READ_POLL_MS)
                .map_err(|e| {
                    warn!("modem: read failed: {e:?}");
                    Error::Modem(ModemError::Link)
                })?;

            if n > 0 {
                if self.cfg.trace {
                    debug!("modem << {}", String::from_utf8_lossy(&chunk[..n]).trim_end());
                }
                scanner.feed(&chunk[..n]);
                if scanner.contains("ERROR") {
                    return Err(ModemError::ErrorResponse(stage).into());
                }
                if scanner.contains(expect) {
                    return Ok(());
                }
            } else {
                // Nothing buffered: pace the poll so an idle link does
                // not spin the consumer.
                std::thread::sleep(Duration::from_millis(u64::from(READ_POLL_MS)));
            }

            if Instant::now() >= deadline {
                return Err(ModemError::Timeout(stage).into());
            }
        }
    }
}

// ── Concatenation reference source ────────────────────────────

/// Fresh 8-bit reference for each multi-part message.
#[cfg(target_os = "espidf")]
fn random_concat_ref() -> u8 {
    // Hardware RNG; entropy quality is irrelevant here, uniqueness
    // between recent messages is what the receiving phone needs.
    (unsafe { esp_idf_svc::sys::esp_random() } & 0xFF) as u8
}

#[cfg(not(target_os = "espidf"))]
fn random_concat_ref() -> u8 {
    use core::sync::atomic::{AtomicU8, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static SALT: AtomicU8 = AtomicU8::new(0x5A);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as u8) ^ SALT.fetch_add(0x9D, Ordering::Relaxed)
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted link: pops one canned response chunk per read call and
    /// records everything written.
    struct MockLink {
        responses: VecDeque<Vec<u8>>,
        pub written: Vec<u8>,
        pub opened: bool,
        pub closed: bool,
    }

    impl MockLink {
        fn new(responses: &[&[u8]]) -> Self {
            Self {
                responses: responses.iter().map(|r| r.to_vec()).collect(),
                written: Vec::new(),
                opened: false,
                closed: false,
            }
        }

        fn written_str(&self) -> String {
            String::from_utf8_lossy(&self.written).into_owned()
        }
    }

    impl SerialLink for &mut MockLink {
        type Error = ();

        fn open(&mut self) -> core::result::Result<(), ()> {
            self.opened = true;
            Ok(())
        }

        fn write(&mut self, data: &[u8]) -> core::result::Result<(), ()> {
            self.written.extend_from_slice(data);
            Ok(())
        }

        fn read(
            &mut self,
            buf: &mut [u8],
            _timeout_ms: u32,
        ) -> core::result::Result<usize, ()> {
            match self.responses.pop_front() {
                Some(r) => {
                    let n = r.len().min(buf.len());
                    buf[..n].copy_from_slice(&r[..n]);
                    Ok(n)
                }
                None => Ok(0),
            }
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn fast_cfg() -> ModemConfig {
        ModemConfig {
            settle_delay_ms: 0,
            response_timeout_ms: 120,
            trace: false,
        }
    }

    fn dest() -> PhoneNumber {
        PhoneNumber::new(65, 91_234_567)
    }

    #[test]
    fn happy_path_single_frame() {
        let mut link = MockLink::new(&[b"OK\r\n", b"> ", b"+CMGS: 41\r\nOK\r\n"]);
        let mut tx = ModemSmsTransport::new(&mut link, fast_cfg());
        let cancel = CancelToken::new();

        tx.send(&dest(), "Hi", &cancel).unwrap();

        let w = link.written_str();
        assert!(w.contains("AT+CMGF=0"));
        assert!(w.contains("AT+CMGS=14"));
        assert!(w.contains("0001000A915619325476000002C834"));
        assert!(link.written.contains(&CTRL_Z));
        assert!(link.opened && link.closed);
    }

    #[test]
    fn error_entering_pdu_mode_sends_no_content() {
        let mut link = MockLink::new(&[b"ERROR\r\n"]);
        let mut tx = ModemSmsTransport::new(&mut link, fast_cfg());

        let err = tx.send(&dest(), "Hi", &CancelToken::new()).unwrap_err();
        assert_eq!(
            err,
            Error::Modem(ModemError::ErrorResponse(TxStage::SetPduMode))
        );

        let w = link.written_str();
        assert!(w.contains("AT+CMGF=0"));
        assert!(!w.contains("AT+CMGS"), "no size announcement after ERROR");
        assert!(!link.written.contains(&CTRL_Z), "no PDU content after ERROR");
    }

    #[test]
    fn multi_part_abort_leaves_earlier_parts_sent() {
        // 200 chars → 2 frames; the modem accepts part 1 then rejects
        // the size announcement of part 2.
        let text: String = core::iter::repeat_n('x', 200).collect();
        let mut link = MockLink::new(&[
            b"OK\r\n",
            b"> ",
            b"+CMGS: 7\r\n",
            b"ERROR\r\n",
        ]);
        let mut tx = ModemSmsTransport::new(&mut link, fast_cfg());

        let err = tx.send(&dest(), &text, &CancelToken::new()).unwrap_err();
        assert_eq!(err, Error::Modem(ModemError::ErrorResponse(TxStage::SetSize)));

        let submitted = link.written.iter().filter(|&&b| b == CTRL_Z).count();
        assert_eq!(submitted, 1, "part 1 went out, part 2 never did");
    }

    #[test]
    fn silent_modem_times_out_at_stage() {
        let mut link = MockLink::new(&[]);
        let mut tx = ModemSmsTransport::new(&mut link, fast_cfg());

        let err = tx.send(&dest(), "Hi", &CancelToken::new()).unwrap_err();
        assert_eq!(err, Error::Modem(ModemError::Timeout(TxStage::SetPduMode)));
        assert!(link.closed, "port is released even on timeout");
    }

    #[test]
    fn cancellation_checkpoint_between_frames() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut link = MockLink::new(&[b"OK\r\n"]);
        let mut tx = ModemSmsTransport::new(&mut link, fast_cfg());

        let err = tx.send(&dest(), "Hi", &cancel).unwrap_err();
        assert_eq!(err, Error::Cancelled);
        assert!(
            !link.written_str().contains("AT+CMGS"),
            "no frame is announced after cancellation"
        );
    }

    #[test]
    fn scanner_matches_tokens_across_chunks() {
        let mut s = ResponseScanner::new();
        s.feed(b"+CM");
        assert!(!s.contains("+CMGS:"));
        s.feed(b"GS: 12\r\n");
        assert!(s.contains("+CMGS:"));
        s.clear();
        assert!(!s.contains("+CMGS:"));
    }

    #[test]
    fn scanner_survives_overflow() {
        let mut s = ResponseScanner::new();
        for _ in 0..50 {
            s.feed(b"noise noise noise ");
        }
        s.feed(b"OK\r\n");
        assert!(s.contains("OK"));
    }
}
