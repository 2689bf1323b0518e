//! Mock adapters for integration tests.
//!
//! Records every port call so tests can assert on the full reaction
//! history without touching real GPIO/PWM/UART.  The serial side gets a
//! scripted link so the whole notifier → queue → transport path runs
//! for real.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ratsentry::app::events::AppEvent;
use ratsentry::app::ports::{
    AlertNotifierPort, BuzzerPort, DispenserPort, EventSink, ObjectDetectorPort,
    RecordsStorePort, ThermalImagerPort,
};
use ratsentry::detection::types::{DetectionBox, DetectionRecord, ThermalFrame, VisionResult};
use ratsentry::error::{Error, Result, SensorError};
use ratsentry::sms::transport::SerialLink;

// ── Reaction call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ReactionCall {
    AddDetection(DetectionRecord),
    Buzz { tone_hz: u16, duration_ms: u32 },
    Dispense { servings: u8 },
    Notify { count: u32, at: u64 },
}

pub type CallLog = Arc<Mutex<Vec<ReactionCall>>>;

// ── Sensors ───────────────────────────────────────────────────

/// Thermal imager returning a queued frame per poll.
pub struct MockImager {
    pub frames: VecDeque<ThermalFrame>,
    pub fail: bool,
}

#[allow(dead_code)]
impl MockImager {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            fail: false,
        }
    }

    pub fn with_uniform(temp: f32) -> Self {
        let mut m = Self::new();
        m.push_uniform(temp);
        m
    }

    pub fn push_uniform(&mut self, temp: f32) {
        let frame = ThermalFrame::new(8, 8, vec![temp; 64]).expect("8x8 frame");
        self.frames.push_back(frame);
    }
}

impl ThermalImagerPort for MockImager {
    fn read_frame(&mut self) -> Result<ThermalFrame> {
        if self.fail {
            return Err(SensorError::I2cReadFailed.into());
        }
        match self.frames.pop_front() {
            Some(f) => Ok(f),
            // Steady ambient once the script runs out.
            None => Ok(ThermalFrame::new(8, 8, vec![21.0; 64]).expect("8x8 frame")),
        }
    }
}

/// Vision module returning a queued result per poll.
pub struct MockDetector {
    pub results: VecDeque<VisionResult>,
    pub fail: bool,
}

#[allow(dead_code)]
impl MockDetector {
    pub fn new() -> Self {
        Self {
            results: VecDeque::new(),
            fail: false,
        }
    }

    pub fn push_box(&mut self, confidence: f32) {
        let mut v = VisionResult::empty();
        let mut label = heapless::String::new();
        let _ = label.push_str("rat");
        let _ = v.boxes.push(DetectionBox {
            x: 12,
            y: 34,
            width: 56,
            height: 40,
            confidence,
            label,
        });
        self.results.push_back(v);
    }

    pub fn push_empty(&mut self) {
        self.results.push_back(VisionResult::empty());
    }
}

impl ObjectDetectorPort for MockDetector {
    fn process(&mut self) -> Result<VisionResult> {
        if self.fail {
            return Err(SensorError::VisionTimeout.into());
        }
        Ok(self.results.pop_front().unwrap_or_else(VisionResult::empty))
    }
}

// ── Reactions ─────────────────────────────────────────────────

pub struct MockStore {
    pub calls: CallLog,
    pub fail: bool,
}

impl MockStore {
    pub fn new(calls: CallLog) -> Self {
        Self { calls, fail: false }
    }
}

impl RecordsStorePort for MockStore {
    async fn add_detection(&mut self, record: &DetectionRecord) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(ReactionCall::AddDetection(*record));
        if self.fail {
            return Err(Error::Storage("mock store down"));
        }
        Ok(())
    }
}

pub struct MockBuzzer {
    pub calls: CallLog,
}

impl BuzzerPort for MockBuzzer {
    async fn buzz(&mut self, tone_hz: u16, duration_ms: u32) -> Result<()> {
        self.calls.lock().unwrap().push(ReactionCall::Buzz {
            tone_hz,
            duration_ms,
        });
        Ok(())
    }
}

pub struct MockDispenser {
    pub calls: CallLog,
}

impl DispenserPort for MockDispenser {
    async fn dispense(&mut self, servings: u8) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(ReactionCall::Dispense { servings });
        Ok(())
    }
}

pub struct MockNotifier {
    pub calls: CallLog,
}

impl AlertNotifierPort for MockNotifier {
    async fn notify(&mut self, detection_count: u32, detected_at: u64) -> Result<()> {
        self.calls.lock().unwrap().push(ReactionCall::Notify {
            count: detection_count,
            at: detected_at,
        });
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<String>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn saw(&self, needle: &str) -> bool {
        self.events.iter().any(|e| e.contains(needle))
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(format!("{:?}", event));
    }
}

// ── Scripted serial link ──────────────────────────────────────

/// Cloneable scripted modem link; responses are queued by the test,
/// writes are captured for inspection.
#[derive(Clone, Default)]
pub struct ScriptedLink {
    rx: Arc<Mutex<VecDeque<Vec<u8>>>>,
    tx: Arc<Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, bytes: &[u8]) {
        self.rx.lock().unwrap().push_back(bytes.to_vec());
    }

    /// Queue the full happy-path handshake for `frames` PDU frames.
    pub fn script_happy_send(&self, frames: usize) {
        self.push_response(b"OK\r\n");
        for _ in 0..frames {
            self.push_response(b"> ");
            self.push_response(b"+CMGS: 7\r\nOK\r\n");
        }
    }

    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.tx.lock().unwrap()).into_owned()
    }

    pub fn written_bytes(&self) -> Vec<u8> {
        self.tx.lock().unwrap().clone()
    }
}

impl SerialLink for ScriptedLink {
    type Error = ();

    fn open(&mut self) -> core::result::Result<(), ()> {
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> core::result::Result<(), ()> {
        self.tx.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _timeout_ms: u32) -> core::result::Result<usize, ()> {
        match self.rx.lock().unwrap().pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }

    fn close(&mut self) {}
}
