//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, push to a future
//! uplink, etc.

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The application service has started.
    Started,

    /// A poll fused into a positive detection.
    Detection {
        count: u32,
        temperature: bool,
        at: u64,
    },

    /// A positive detection was handled but at least one reaction
    /// branch failed (details are in the log).
    ReactionDegraded,

    /// An alert was suppressed by the rate limiter.
    AlertRateLimited,

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryData {
    /// Fusion polls since boot.
    pub polls: u64,
    /// Positive detections since boot.
    pub detections: u64,
    /// Unix seconds of the last positive detection (0 = none yet).
    pub last_detection_at: u64,
    /// Pending items on the modem queue.
    pub gsm_queue_depth: usize,
    /// Pending items on the buzzer queue.
    pub buzzer_queue_depth: usize,
    /// Pending items on the dispenser queue.
    pub dispenser_queue_depth: usize,
}
