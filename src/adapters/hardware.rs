//! Hardware adapters — bridge real peripherals to domain port traits.
//!
//! [`ThermalAdapter`] and [`VisionAdapter`] wrap the sensor drivers
//! behind [`ThermalImagerPort`] and [`ObjectDetectorPort`].  They are
//! separate adapters (not one combined hub) because the service borrows
//! each port independently.
//!
//! [`QueuedBuzzer`] and [`QueuedDispenser`] are the actuator side: each
//! holds a handle to its resource's [`WorkQueue`] and enqueues timed
//! PWM bursts as jobs, so the control path never sleeps on hardware.
//! Their port futures resolve when the queued job has actually run.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::app::ports::{BuzzerPort, DispenserPort, ObjectDetectorPort, ThermalImagerPort};
use crate::detection::types::{ThermalFrame, VisionResult};
use crate::drivers::buzzer::BuzzerDriver;
use crate::drivers::dispenser::{Direction, DispenserDriver};
use crate::error::Result;
use crate::queue::WorkQueue;
use crate::sensors::thermal::ThermalImager;
use crate::sensors::vision::VisionModule;

// ── Sensors ───────────────────────────────────────────────────

/// Thermal array behind its port.
pub struct ThermalAdapter {
    imager: ThermalImager,
}

impl ThermalAdapter {
    pub fn new(imager: ThermalImager) -> Self {
        Self { imager }
    }
}

impl ThermalImagerPort for ThermalAdapter {
    fn read_frame(&mut self) -> Result<ThermalFrame> {
        self.imager.read_frame().map_err(Into::into)
    }
}

/// AI camera behind its port.
pub struct VisionAdapter {
    module: VisionModule,
}

impl VisionAdapter {
    pub fn new(module: VisionModule) -> Self {
        Self { module }
    }
}

impl ObjectDetectorPort for VisionAdapter {
    fn process(&mut self) -> Result<VisionResult> {
        self.module.process().map_err(Into::into)
    }
}

// ── Buzzer (queue-backed) ─────────────────────────────────────

/// Buzzer port that serializes tone bursts through its work queue.
pub struct QueuedBuzzer {
    queue: WorkQueue,
    driver: Arc<Mutex<BuzzerDriver>>,
}

impl QueuedBuzzer {
    pub fn new(queue: WorkQueue) -> Self {
        Self {
            queue,
            driver: Arc::new(Mutex::new(BuzzerDriver::new())),
        }
    }
}

impl BuzzerPort for QueuedBuzzer {
    async fn buzz(&mut self, tone_hz: u16, duration_ms: u32) -> Result<()> {
        let driver = self.driver.clone();
        let handle = self.queue.enqueue_with_handle(Box::new(move |_cancel| {
            // Uncontended: only this queue's consumer runs buzzer jobs.
            let mut d = driver.lock().expect("buzzer driver mutex poisoned");
            d.start_tone(tone_hz);
            std::thread::sleep(Duration::from_millis(u64::from(duration_ms)));
            d.stop();
            Ok(())
        }))?;
        handle.wait().await
    }
}

// ── Dispenser (queue-backed) ──────────────────────────────────

/// Auger duty while dispensing.
const AUGER_DUTY: u8 = 70;

/// Pause between consecutive servings so the chute can clear.
const INTER_SERVING_PAUSE_MS: u64 = 250;

/// Dispenser port that serializes auger runs through its work queue.
pub struct QueuedDispenser {
    queue: WorkQueue,
    driver: Arc<Mutex<DispenserDriver>>,
    serving_run_ms: u32,
}

impl QueuedDispenser {
    pub fn new(queue: WorkQueue, serving_run_ms: u32) -> Self {
        Self {
            queue,
            driver: Arc::new(Mutex::new(DispenserDriver::new())),
            serving_run_ms,
        }
    }
}

impl DispenserPort for QueuedDispenser {
    async fn dispense(&mut self, servings: u8) -> Result<()> {
        let driver = self.driver.clone();
        let run_ms = u64::from(self.serving_run_ms);
        let handle = self.queue.enqueue_with_handle(Box::new(move |cancel| {
            let mut d = driver.lock().expect("dispenser driver mutex poisoned");
            for i in 0..servings {
                // A cancelled job stops between servings, never mid-run.
                if cancel.is_cancelled() {
                    d.stop();
                    return Err(crate::error::Error::Cancelled);
                }
                d.run(AUGER_DUTY, Direction::Forward);
                std::thread::sleep(Duration::from_millis(run_ms));
                d.stop();
                if i + 1 < servings {
                    std::thread::sleep(Duration::from_millis(INTER_SERVING_PAUSE_MS));
                }
            }
            Ok(())
        }))?;
        handle.wait().await
    }
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::task_pin::Core;
    use futures_lite::future::block_on;

    #[test]
    fn buzz_runs_on_the_queue_and_resolves() {
        let q = WorkQueue::new("buzz-adapter-test");
        let _ = q.start(Core::App, 5, 64, "buzz-t\0");
        let mut buzzer = QueuedBuzzer::new(q);

        block_on(buzzer.buzz(250, 1)).unwrap();
        assert!(!buzzer.driver.lock().unwrap().is_sounding());
    }

    #[test]
    fn dispense_runs_all_servings() {
        let q = WorkQueue::new("feed-adapter-test");
        let _ = q.start(Core::App, 5, 64, "feed-t\0");
        let mut dispenser = QueuedDispenser::new(q, 1);

        block_on(dispenser.dispense(3)).unwrap();
        assert!(!dispenser.driver.lock().unwrap().is_running());
    }
}
