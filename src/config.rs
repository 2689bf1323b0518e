//! System configuration parameters
//!
//! All tunable parameters for the RatSentry system.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

use crate::sms::pdu::PhoneNumber;

/// Maximum number of SMS alert recipients.
pub const MAX_RECIPIENTS: usize = 4;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Detection ---
    /// Lower bound of the rodent body-heat band (Celsius).
    pub thermal_min_c: f32,
    /// Upper bound of the rodent body-heat band (Celsius).
    pub thermal_max_c: f32,
    /// When false, the thermal channel is ignored and vision alone decides.
    pub use_thermal_sensor: bool,
    /// Minimum vision confidence for a box to count as a detection.
    pub min_confidence: f32,

    // --- Reaction ---
    /// Buzzer tone (Hz) sounded on detection.
    pub buzz_tone_hz: u16,
    /// Buzzer duration (milliseconds).
    pub buzz_duration_ms: u32,
    /// Bait servings dispensed per detection.
    pub dispense_servings: u8,
    /// Auger run time for one serving (milliseconds).
    pub serving_run_ms: u32,

    // --- SMS alerting ---
    pub sms: SmsConfig,

    // --- Timing ---
    /// Sensor poll interval (milliseconds).
    pub poll_interval_ms: u32,
    /// Telemetry report interval (seconds).
    pub telemetry_interval_secs: u32,
}

/// SMS alert delivery parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Alert recipients, international format.
    pub recipients: heapless::Vec<PhoneNumber, MAX_RECIPIENTS>,
    /// Message template; `{count}` and `{time}` are substituted per alert.
    pub template: heapless::String<96>,
    /// Modem UART baud rate.
    pub baud: u32,
    /// Delay after opening the port before the first AT command (ms).
    pub settle_delay_ms: u32,
    /// Per-stage deadline for a recognised modem response (ms).
    pub response_timeout_ms: u32,
    /// Minimum spacing between alert bursts (seconds); extra detections
    /// within the window are counted but not texted.
    pub min_alert_interval_secs: u32,
    /// Log every AT exchange at debug level.
    pub trace: bool,
}

impl Default for SmsConfig {
    fn default() -> Self {
        let mut template = heapless::String::new();
        // Cannot overflow: literal is shorter than the 96-byte capacity.
        let _ = template.push_str("Rat detected! count={count} at {time}");
        Self {
            recipients: heapless::Vec::new(),
            template,
            baud: crate::pins::GSM_UART_BAUD,
            settle_delay_ms: 300,
            response_timeout_ms: 10_000,
            min_alert_interval_secs: 60,
            trace: false,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Detection: rat body surface sits well above ambient but
            // below sunlit-background extremes.
            thermal_min_c: 28.0,
            thermal_max_c: 40.0,
            use_thermal_sensor: true,
            min_confidence: 0.5,

            // Reaction
            buzz_tone_hz: 250,
            buzz_duration_ms: 1_000,
            dispense_servings: 1,
            serving_run_ms: 1_500,

            sms: SmsConfig::default(),

            // Timing
            poll_interval_ms: 1_000,       // 1 Hz fusion cycle
            telemetry_interval_secs: 60,   // 1/min
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.thermal_min_c < c.thermal_max_c);
        assert!(c.min_confidence > 0.0 && c.min_confidence <= 1.0);
        assert!(c.buzz_duration_ms > 0);
        assert!(c.dispense_servings > 0);
        assert!(c.poll_interval_ms > 0);
        assert!(c.sms.response_timeout_ms > 0);
    }

    #[test]
    fn serde_roundtrip() {
        let mut c = SystemConfig::default();
        let _ = c.sms.recipients.push(PhoneNumber::new(65, 91_234_567));
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert!((c.thermal_min_c - c2.thermal_min_c).abs() < 0.001);
        assert_eq!(c.buzz_tone_hz, c2.buzz_tone_hz);
        assert_eq!(c.sms.recipients, c2.sms.recipients);
        assert_eq!(c.sms.template, c2.sms.template);
    }

    #[test]
    fn thermal_band_invariant() {
        let c = SystemConfig::default();
        assert!(
            c.thermal_min_c < c.thermal_max_c,
            "thermal band must be non-empty or no cell can ever match"
        );
    }

    #[test]
    fn postcard_roundtrip() {
        let c = SystemConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: SystemConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.buzz_tone_hz, c2.buzz_tone_hz);
        assert!((c.thermal_max_c - c2.thermal_max_c).abs() < 0.001);
    }
}
