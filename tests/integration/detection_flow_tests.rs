//! Poll → decide → react flow against mock adapters.
//!
//! Exercises [`AppService::poll_once`] end to end: sensor pull, fusion
//! decision, and the four-way reaction fan-out.

use futures_lite::future::block_on;

use ratsentry::app::service::AppService;
use ratsentry::config::SystemConfig;
use ratsentry::error::{Error, SensorError};
use ratsentry::queue::CancelToken;

use crate::mock_hw::*;

const NOW: u64 = 1_754_000_000;

struct Rig {
    app: AppService,
    imager: MockImager,
    detector: MockDetector,
    store: MockStore,
    buzzer: MockBuzzer,
    dispenser: MockDispenser,
    notifier: MockNotifier,
    sink: RecordingSink,
    calls: CallLog,
}

fn rig(cfg: &SystemConfig) -> Rig {
    let calls: CallLog = CallLog::default();
    Rig {
        app: AppService::new(cfg),
        imager: MockImager::new(),
        detector: MockDetector::new(),
        store: MockStore::new(calls.clone()),
        buzzer: MockBuzzer {
            calls: calls.clone(),
        },
        dispenser: MockDispenser {
            calls: calls.clone(),
        },
        notifier: MockNotifier {
            calls: calls.clone(),
        },
        sink: RecordingSink::new(),
        calls,
    }
}

fn poll(r: &mut Rig) -> ratsentry::error::Result<ratsentry::detection::types::DetectionResult> {
    block_on(r.app.poll_once(
        &mut r.imager,
        &mut r.detector,
        &mut r.store,
        &mut r.buzzer,
        &mut r.dispenser,
        &mut r.notifier,
        &mut r.sink,
        NOW,
        &CancelToken::new(),
    ))
}

#[test]
fn confident_box_with_body_heat_triggers_all_reactions() {
    let cfg = SystemConfig::default();
    let mut r = rig(&cfg);
    r.imager.push_uniform(33.0); // inside the 28–40 band
    r.detector.push_box(0.8); // above the 0.5 bar

    let result = poll(&mut r).unwrap();
    assert!(result.is_detected());
    assert_eq!(result.detection_count, 1);
    assert!(result.is_temperature_detected);
    assert_eq!(result.detected_at, NOW);

    let calls = r.calls.lock().unwrap();
    assert_eq!(calls.len(), 4);
    assert!(calls.contains(&ReactionCall::Buzz {
        tone_hz: 250,
        duration_ms: 1000
    }));
    assert!(calls.contains(&ReactionCall::Dispense { servings: 1 }));
    assert!(calls.contains(&ReactionCall::Notify { count: 1, at: NOW }));
    assert!(
        calls
            .iter()
            .any(|c| matches!(c, ReactionCall::AddDetection(rec) if rec.detected_at == NOW))
    );

    assert!(r.sink.saw("Detection"));
}

#[test]
fn ambient_temperature_blocks_detection_when_thermal_enabled() {
    let cfg = SystemConfig::default();
    let mut r = rig(&cfg);
    r.imager.push_uniform(21.0); // ambient only
    r.detector.push_box(0.9);

    let result = poll(&mut r).unwrap();
    assert!(!result.is_detected());
    assert!(r.calls.lock().unwrap().is_empty(), "no reactions fire");
}

#[test]
fn vision_alone_decides_when_thermal_disabled() {
    let cfg = SystemConfig {
        use_thermal_sensor: false,
        ..SystemConfig::default()
    };
    let mut r = rig(&cfg);
    r.imager.push_uniform(21.0);
    r.detector.push_box(0.9);

    let result = poll(&mut r).unwrap();
    assert!(result.ignore_temperature);
    assert!(result.is_detected());
    assert_eq!(r.calls.lock().unwrap().len(), 4);
}

#[test]
fn low_confidence_box_is_not_a_detection() {
    let cfg = SystemConfig::default();
    let mut r = rig(&cfg);
    r.imager.push_uniform(33.0);
    r.detector.push_box(0.3);

    let result = poll(&mut r).unwrap();
    assert_eq!(result.detection_count, 0);
    assert!(!result.is_detected());
    assert!(r.calls.lock().unwrap().is_empty());
}

#[test]
fn sensor_failure_propagates_and_skips_reactions() {
    let cfg = SystemConfig::default();
    let mut r = rig(&cfg);
    r.imager.fail = true;

    let err = poll(&mut r).unwrap_err();
    assert_eq!(err, Error::Sensor(SensorError::I2cReadFailed));
    assert!(r.calls.lock().unwrap().is_empty());
}

#[test]
fn vision_failure_propagates_unretried() {
    let cfg = SystemConfig::default();
    let mut r = rig(&cfg);
    r.imager.push_uniform(33.0);
    r.detector.fail = true;

    let err = poll(&mut r).unwrap_err();
    assert_eq!(err, Error::Sensor(SensorError::VisionTimeout));
}

#[test]
fn store_failure_still_runs_other_reactions_and_degrades() {
    let cfg = SystemConfig::default();
    let mut r = rig(&cfg);
    r.imager.push_uniform(33.0);
    r.detector.push_box(0.8);
    r.store.fail = true;

    // The poll itself succeeds: the detection stands, the degraded
    // reaction is reported through the sink.
    let result = poll(&mut r).unwrap();
    assert!(result.is_detected());
    assert_eq!(r.calls.lock().unwrap().len(), 4);
    assert!(r.sink.saw("ReactionDegraded"));
}

#[test]
fn detection_tally_accumulates_across_polls() {
    let cfg = SystemConfig::default();
    let mut r = rig(&cfg);
    r.imager.push_uniform(33.0);
    r.detector.push_box(0.8);
    r.imager.push_uniform(21.0);
    r.detector.push_empty();
    r.imager.push_uniform(34.0);
    r.detector.push_box(0.7);

    let _ = poll(&mut r).unwrap();
    let _ = poll(&mut r).unwrap();
    let _ = poll(&mut r).unwrap();

    assert_eq!(r.app.detections(), 2);
    let t = r.app.build_telemetry(0, 0, 0);
    assert_eq!(t.polls, 3);
    assert_eq!(t.detections, 2);
    assert_eq!(t.last_detection_at, NOW);
}
