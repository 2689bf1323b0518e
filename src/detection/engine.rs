//! Sensor-fusion decision logic.
//!
//! Pure: one thermal frame + one vision result in, one
//! [`DetectionResult`] out.  No retries, no smoothing across polls —
//! if a sensor read failed, the caller never gets here.

use crate::config::SystemConfig;
use crate::detection::types::{DetectionResult, ThermalFrame, VisionResult};

/// Fuses the two sensing modalities under configured thresholds.
#[derive(Debug, Clone, Copy)]
pub struct DetectionEngine {
    thermal_min_c: f32,
    thermal_max_c: f32,
    use_thermal: bool,
    min_confidence: f32,
}

impl DetectionEngine {
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            thermal_min_c: cfg.thermal_min_c,
            thermal_max_c: cfg.thermal_max_c,
            use_thermal: cfg.use_thermal_sensor,
            min_confidence: cfg.min_confidence,
        }
    }

    /// Evaluate one poll.  `now_unix` stamps the result (0 = unsynced
    /// clock, still a valid result).
    pub fn decide(
        &self,
        thermal: &ThermalFrame,
        vision: &VisionResult,
        now_unix: u64,
    ) -> DetectionResult {
        // Body-heat test: any cell inside the configured band.
        let is_temperature_detected = thermal
            .cells()
            .iter()
            .any(|&t| t >= self.thermal_min_c && t <= self.thermal_max_c);

        // Presence signal: any box over the confidence bar counts as
        // one detection, however many boxes fired.
        let detection_count = u32::from(
            vision
                .boxes
                .iter()
                .any(|b| b.confidence >= self.min_confidence),
        );

        DetectionResult {
            detection_count,
            is_temperature_detected,
            ignore_temperature: !self.use_thermal,
            detected_at: now_unix,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
