//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A future uplink adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | polls={} | detections={} | last_at={} | \
                     q(gsm={} buzz={} feed={})",
                    t.polls,
                    t.detections,
                    t.last_detection_at,
                    t.gsm_queue_depth,
                    t.buzzer_queue_depth,
                    t.dispenser_queue_depth,
                );
            }
            AppEvent::Detection {
                count,
                temperature,
                at,
            } => {
                info!("DETECT | count={} temp={} at={}", count, temperature, at);
            }
            AppEvent::ReactionDegraded => {
                warn!("REACT | at least one reaction branch failed");
            }
            AppEvent::AlertRateLimited => {
                info!("ALERT | suppressed by interval guard");
            }
            AppEvent::Started => {
                info!("START | detection service up");
            }
        }
    }
}
