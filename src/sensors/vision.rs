//! AI camera vision module driver (UART2).
//!
//! Inference runs on the camera module; this driver only speaks its
//! report protocol.  One poll:
//!
//! ```text
//!   firmware ──"DET\n"──▶ module
//!   module   ──{"boxes":[{"x":..,"y":..,"w":..,"h":..,"conf":..,"label":".."}]}\n──▶
//!            ──[u32 LE jpeg length][jpeg bytes]──▶
//! ```
//!
//! The JPEG is the frame the boxes were computed on; it is carried in
//! the [`VisionResult`] for later display and never influences the
//! detection decision.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: real UART transactions with a response deadline.
//! On host/test: reads an injectable [`VisionResult`].

use crate::detection::types::VisionResult;
#[cfg(target_os = "espidf")]
use crate::detection::types::{DetectionBox, FrameFormat, MAX_BOXES};
use crate::error::SensorError;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
#[cfg(target_os = "espidf")]
use serde::Deserialize;

#[cfg(not(target_os = "espidf"))]
use std::sync::Mutex;

/// How long the module may take to answer one poll.
#[cfg(target_os = "espidf")]
const RESPONSE_DEADLINE_MS: u64 = 800;

/// Upper bound on the carried JPEG (module thumbnails are ~10 KB).
#[cfg(target_os = "espidf")]
const MAX_JPEG_BYTES: usize = 32 * 1024;

#[cfg(not(target_os = "espidf"))]
static SIM_RESULT: Mutex<Option<VisionResult>> = Mutex::new(None);

/// Inject the next simulated vision result (defaults to "nothing seen").
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_result(result: VisionResult) {
    *SIM_RESULT.lock().expect("sim vision mutex poisoned") = Some(result);
}

// ── Wire format ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
#[derive(Debug, Deserialize)]
struct BoxReport {
    x: u16,
    y: u16,
    w: u16,
    h: u16,
    conf: f32,
    #[serde(default)]
    label: String,
}

#[cfg(target_os = "espidf")]
#[derive(Debug, Deserialize)]
struct DetectionReport {
    boxes: Vec<BoxReport>,
}

// ── Driver ────────────────────────────────────────────────────

pub struct VisionModule {
    initialised: bool,
}

impl VisionModule {
    pub fn new() -> Self {
        Self { initialised: false }
    }

    /// Run one capture + inference round trip.
    pub fn process(&mut self) -> Result<VisionResult, SensorError> {
        self.ensure_initialised()?;
        self.poll_module()
    }

    #[cfg(target_os = "espidf")]
    fn ensure_initialised(&mut self) -> Result<(), SensorError> {
        if !self.initialised {
            hw_init::uart_init(
                hw_init::UART_VISION,
                crate::pins::VISION_UART_TX_GPIO,
                crate::pins::VISION_UART_RX_GPIO,
                crate::pins::VISION_UART_BAUD,
            )
            .map_err(|_| SensorError::VisionProtocol)?;
            self.initialised = true;
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn ensure_initialised(&mut self) -> Result<(), SensorError> {
        if !self.initialised {
            self.initialised = true;
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn poll_module(&mut self) -> Result<VisionResult, SensorError> {
        use std::time::{Duration, Instant};

        hw_init::uart_purge_input(hw_init::UART_VISION);
        if !hw_init::uart_write(hw_init::UART_VISION, b"DET\n") {
            return Err(SensorError::VisionProtocol);
        }

        let deadline = Instant::now() + Duration::from_millis(RESPONSE_DEADLINE_MS);

        // Report line first …
        let line = read_until_newline(deadline)?;
        let report: DetectionReport =
            serde_json::from_slice(&line).map_err(|_| SensorError::VisionProtocol)?;

        // … then the length-prefixed frame.
        let mut len_bytes = [0u8; 4];
        read_exact(&mut len_bytes, deadline)?;
        let jpeg_len = u32::from_le_bytes(len_bytes) as usize;
        if jpeg_len > MAX_JPEG_BYTES {
            return Err(SensorError::VisionProtocol);
        }
        let mut frame = vec![0u8; jpeg_len];
        read_exact(&mut frame, deadline)?;

        let mut boxes = heapless::Vec::new();
        for b in report.boxes.into_iter().take(MAX_BOXES) {
            let mut label = heapless::String::new();
            for c in b.label.chars() {
                if label.push(c).is_err() {
                    break; // keep what fits
                }
            }
            let _ = boxes.push(DetectionBox {
                x: b.x,
                y: b.y,
                width: b.w,
                height: b.h,
                confidence: b.conf,
                label,
            });
        }

        Ok(VisionResult {
            boxes,
            frame_format: FrameFormat::Jpeg,
            frame,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn poll_module(&mut self) -> Result<VisionResult, SensorError> {
        let injected = SIM_RESULT
            .lock()
            .expect("sim vision mutex poisoned")
            .take();
        Ok(injected.unwrap_or_else(VisionResult::empty))
    }
}

// ── UART read helpers ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn read_until_newline(deadline: std::time::Instant) -> Result<Vec<u8>, SensorError> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if hw_init::uart_read(hw_init::UART_VISION, &mut byte, 20) == 1 {
            if byte[0] == b'\n' {
                return Ok(line);
            }
            line.push(byte[0]);
            if line.len() > 2048 {
                return Err(SensorError::VisionProtocol);
            }
        } else if std::time::Instant::now() >= deadline {
            return Err(SensorError::VisionTimeout);
        }
    }
}

#[cfg(target_os = "espidf")]
fn read_exact(buf: &mut [u8], deadline: std::time::Instant) -> Result<(), SensorError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = hw_init::uart_read(hw_init::UART_VISION, &mut buf[filled..], 20);
        filled += n;
        if n == 0 && std::time::Instant::now() >= deadline {
            return Err(SensorError::VisionTimeout);
        }
    }
    Ok(())
}
