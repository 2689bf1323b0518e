//! Detection reaction fan-out.
//!
//! A positive detection triggers four independent reactions:
//!
//! ```text
//!                    ┌──▶ RecordsStorePort.add_detection
//!  DetectionResult ──┼──▶ BuzzerPort.buzz(tone, duration)
//!   (is_detected)    ├──▶ DispenserPort.dispense(servings)
//!                    └──▶ AlertNotifierPort.notify(count, time)
//! ```
//!
//! All four futures are joined concurrently and every branch settles
//! before the handler returns — one failing reaction never prevents the
//! others, and there is no compensation or rollback for partial
//! failure.  The first error (in fixed branch order) is surfaced after
//! everything has settled.
//!
//! Cancellation is cooperative and best-effort: it is checked once at
//! the fan-out boundary, and commands already queued to hardware are
//! never recalled.

use futures_lite::future::zip;
use log::{debug, warn};

use crate::config::SystemConfig;
use crate::detection::types::{DetectionRecord, DetectionResult};
use crate::error::{Error, Result};
use crate::queue::CancelToken;

use crate::app::ports::{AlertNotifierPort, BuzzerPort, DispenserPort, RecordsStorePort};

/// Reacts to positive detection results.
#[derive(Debug, Clone, Copy)]
pub struct DetectionResultHandler {
    tone_hz: u16,
    duration_ms: u32,
    servings: u8,
}

impl DetectionResultHandler {
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            tone_hz: cfg.buzz_tone_hz,
            duration_ms: cfg.buzz_duration_ms,
            servings: cfg.dispense_servings,
        }
    }

    /// Fan out all four reactions for `result`.
    ///
    /// A no-op for negative results.  Returns the first branch error
    /// only after every branch has settled.
    pub async fn handle<S, B, D, N>(
        &self,
        result: &DetectionResult,
        store: &mut S,
        buzzer: &mut B,
        dispenser: &mut D,
        notifier: &mut N,
        cancel: &CancelToken,
    ) -> Result<()>
    where
        S: RecordsStorePort,
        B: BuzzerPort,
        D: DispenserPort,
        N: AlertNotifierPort,
    {
        if !result.is_detected() {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        debug!(
            "reaction: count={} temp={} at={}",
            result.detection_count, result.is_temperature_detected, result.detected_at
        );

        let record = DetectionRecord::from(result);
        let persist = store.add_detection(&record);
        let buzz = buzzer.buzz(self.tone_hz, self.duration_ms);
        let dispense = dispenser.dispense(self.servings);
        let notify = notifier.notify(result.detection_count, result.detected_at);

        // Nested zip: all four polled concurrently, none short-circuits.
        let ((r_persist, r_buzz), (r_dispense, r_notify)) =
            zip(zip(persist, buzz), zip(dispense, notify)).await;

        let mut first_err = None;
        for (branch, r) in [
            ("store", r_persist),
            ("buzzer", r_buzz),
            ("dispenser", r_dispense),
            ("notifier", r_notify),
        ] {
            if let Err(e) = r {
                warn!("reaction: {branch} failed: {e}");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
