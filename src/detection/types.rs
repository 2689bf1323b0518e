//! Value types flowing through the detection pipeline.
//!
//! All of these are plain snapshots: produced once per poll, never
//! mutated, cheap to hand across task boundaries.

use serde::{Deserialize, Serialize};

/// Maximum boxes one vision result can carry.
pub const MAX_BOXES: usize = 16;

// ── Thermal ───────────────────────────────────────────────────

/// One thermal image: a `width × height` grid of cell temperatures in
/// degrees Celsius, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalFrame {
    pub width: usize,
    pub height: usize,
    cells: Vec<f32>,
}

impl ThermalFrame {
    /// Build a frame; `cells.len()` must equal `width * height`.
    pub fn new(width: usize, height: usize, cells: Vec<f32>) -> Option<Self> {
        if cells.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            cells,
        })
    }

    /// Temperature at `(x, y)`; `None` outside the grid.
    pub fn cell(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.cells[y * self.width + x])
    }

    /// Every cell, row-major.
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }
}

// ── Vision ────────────────────────────────────────────────────

/// One detection from the vision module, in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionBox {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// Model confidence in `[0, 1]`.
    pub confidence: f32,
    pub label: heapless::String<16>,
}

/// Encoding of the raw frame the vision module captured alongside its
/// boxes.  Kept for later display only — never decision-relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Jpeg,
    /// 8-bit grayscale, row-major.
    Gray8,
}

/// Vision module output for one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionResult {
    pub boxes: heapless::Vec<DetectionBox, MAX_BOXES>,
    pub frame_format: FrameFormat,
    pub frame: Vec<u8>,
}

impl VisionResult {
    /// A result with no boxes and no frame payload.
    pub fn empty() -> Self {
        Self {
            boxes: heapless::Vec::new(),
            frame_format: FrameFormat::Gray8,
            frame: Vec::new(),
        }
    }
}

// ── Fused decision ────────────────────────────────────────────

/// Outcome of fusing one thermal frame with one vision result.
///
/// Whether this counts as a detection is *derived*, never stored:
/// [`is_detected`](Self::is_detected) recomputes it from the three
/// fields on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionResult {
    /// 1 when any box cleared the confidence bar, else 0.  A presence
    /// signal: multiplicity is collapsed, not counted.
    pub detection_count: u32,
    /// Any thermal cell inside the configured body-heat band.
    pub is_temperature_detected: bool,
    /// Thermal channel disabled by configuration.
    pub ignore_temperature: bool,
    /// Unix seconds at decision time; 0 when the wall clock is unsynced.
    pub detected_at: u64,
}

impl DetectionResult {
    /// Vision must fire, and the thermal channel must agree unless it
    /// is configured out.
    pub fn is_detected(&self) -> bool {
        self.detection_count > 0 && (self.ignore_temperature || self.is_temperature_detected)
    }
}

/// Persisted form of a positive detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub detection_count: u32,
    pub temperature_detected: bool,
    pub detected_at: u64,
}

impl From<&DetectionResult> for DetectionRecord {
    fn from(r: &DetectionResult) -> Self {
        Self {
            detection_count: r.detection_count,
            temperature_detected: r.is_temperature_detected,
            detected_at: r.detected_at,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
