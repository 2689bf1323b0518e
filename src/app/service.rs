//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the detection engine and the reaction handler.
//! It exposes a clean, hardware-agnostic API.  All I/O flows through
//! port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!  ThermalImagerPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  ObjectDetectorPort ─▶ │        AppService        │
//!                        │  engine · handler · tally │──▶ store / buzzer /
//!                        └──────────────────────────┘    dispenser / notifier
//! ```

use log::info;

use crate::config::SystemConfig;
use crate::detection::engine::DetectionEngine;
use crate::detection::handler::DetectionResultHandler;
use crate::detection::types::DetectionResult;
use crate::error::Result;
use crate::queue::CancelToken;

use super::events::{AppEvent, TelemetryData};
use super::ports::{
    AlertNotifierPort, BuzzerPort, DispenserPort, EventSink, ObjectDetectorPort,
    RecordsStorePort, ThermalImagerPort,
};

/// The application service orchestrates one poll/decide/react cycle.
pub struct AppService {
    engine: DetectionEngine,
    handler: DetectionResultHandler,
    polls: u64,
    detections: u64,
    last_detection_at: u64,
}

impl AppService {
    /// Construct the service from configuration.
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            engine: DetectionEngine::new(config),
            handler: DetectionResultHandler::new(config),
            polls: 0,
            detections: 0,
            last_detection_at: 0,
        }
    }

    /// Announce startup through the event sink.
    pub fn start(&self, sink: &mut impl EventSink) {
        info!("AppService: started");
        sink.emit(&AppEvent::Started);
    }

    /// Run one fusion cycle: pull both sensors, decide, and — on a
    /// positive result — fan out the four reactions and await them.
    ///
    /// Sensor errors propagate unretried; this layer does no smoothing
    /// across polls.  A reaction failure is reported through the sink
    /// as degraded but does not fail the poll: the detection stands.
    #[allow(clippy::too_many_arguments)] // one parameter per injected port
    pub async fn poll_once<I, V, S, B, D, N, E>(
        &mut self,
        imager: &mut I,
        detector: &mut V,
        store: &mut S,
        buzzer: &mut B,
        dispenser: &mut D,
        notifier: &mut N,
        sink: &mut E,
        now_unix: u64,
        cancel: &CancelToken,
    ) -> Result<DetectionResult>
    where
        I: ThermalImagerPort,
        V: ObjectDetectorPort,
        S: RecordsStorePort,
        B: BuzzerPort,
        D: DispenserPort,
        N: AlertNotifierPort,
        E: EventSink,
    {
        let frame = imager.read_frame()?;
        let vision = detector.process()?;

        let result = self.engine.decide(&frame, &vision, now_unix);
        self.polls += 1;

        if result.is_detected() {
            self.detections += 1;
            self.last_detection_at = now_unix;
            info!(
                "Detection #{}: count={} temp={}",
                self.detections, result.detection_count, result.is_temperature_detected
            );
            sink.emit(&AppEvent::Detection {
                count: result.detection_count,
                temperature: result.is_temperature_detected,
                at: result.detected_at,
            });

            if self
                .handler
                .handle(&result, store, buzzer, dispenser, notifier, cancel)
                .await
                .is_err()
            {
                // Branch details were already logged by the handler.
                sink.emit(&AppEvent::ReactionDegraded);
            }
        }

        Ok(result)
    }

    /// Assemble a telemetry snapshot; queue depths come from the
    /// caller, the service holds no queue handles.
    pub fn build_telemetry(
        &self,
        gsm_queue_depth: usize,
        buzzer_queue_depth: usize,
        dispenser_queue_depth: usize,
    ) -> TelemetryData {
        TelemetryData {
            polls: self.polls,
            detections: self.detections,
            last_detection_at: self.last_detection_at,
            gsm_queue_depth,
            buzzer_queue_depth,
            dispenser_queue_depth,
        }
    }

    pub fn detections(&self) -> u64 {
        self.detections
    }
}
