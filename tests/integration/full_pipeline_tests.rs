//! Full reaction pipeline with real work queues.
//!
//! Sensors are scripted, but everything downstream is real: the
//! detection service fans out into the queue-backed buzzer/dispenser
//! adapters, the NVS-backed detection log, and the SMS notifier driving
//! the actual PDU transport over a scripted serial link.

use futures_lite::future::block_on;

use ratsentry::adapters::detection_log::DetectionLog;
use ratsentry::adapters::hardware::{QueuedBuzzer, QueuedDispenser};
use ratsentry::adapters::nvs::NvsAdapter;
use ratsentry::adapters::sms_notifier::SmsNotifier;
use ratsentry::app::service::AppService;
use ratsentry::config::SystemConfig;
use ratsentry::drivers::task_pin::Core;
use ratsentry::queue::{CancelToken, WorkQueue};
use ratsentry::sms::pdu::PhoneNumber;
use ratsentry::sms::transport::{ModemConfig, ModemSmsTransport};

use crate::mock_hw::{MockDetector, MockImager, RecordingSink, ScriptedLink};

const NOW: u64 = 1_754_000_000;

fn pipeline_config() -> SystemConfig {
    let mut sms = ratsentry::config::SmsConfig {
        settle_delay_ms: 0,
        response_timeout_ms: 500,
        ..Default::default()
    };
    let _ = sms.recipients.push(PhoneNumber::new(65, 91_234_567));
    SystemConfig {
        serving_run_ms: 100, // keep the auger test fast
        buzz_duration_ms: 50,
        sms,
        ..SystemConfig::default()
    }
}

#[test]
fn detection_drives_every_hardware_path() {
    let cfg = pipeline_config();

    // Per-resource queues with live consumers, as in main().
    let gsm_q = WorkQueue::new("gsm-q");
    let _gsm = gsm_q.start(Core::Pro, 12, 64, "gsm-q\0");
    let buzz_q = WorkQueue::new("buzz-q");
    let _buzz = buzz_q.start(Core::App, 10, 64, "buzz-q\0");
    let feed_q = WorkQueue::new("feed-q");
    let _feed = feed_q.start(Core::App, 10, 64, "feed-q\0");

    let link = ScriptedLink::new();
    link.script_happy_send(1);

    let mut imager = MockImager::with_uniform(33.0);
    let mut detector = MockDetector::new();
    detector.push_box(0.8);

    let mut store = DetectionLog::new(NvsAdapter::new().unwrap());
    let mut buzzer = QueuedBuzzer::new(buzz_q.clone());
    let mut dispenser = QueuedDispenser::new(feed_q.clone(), cfg.serving_run_ms);
    let mut notifier = SmsNotifier::new(
        gsm_q.clone(),
        ModemSmsTransport::new(link.clone(), ModemConfig::from(&cfg.sms)),
        &cfg.sms,
    );
    let mut sink = RecordingSink::new();

    let mut app = AppService::new(&cfg);
    let result = block_on(app.poll_once(
        &mut imager,
        &mut detector,
        &mut store,
        &mut buzzer,
        &mut dispenser,
        &mut notifier,
        &mut sink,
        NOW,
        &CancelToken::new(),
    ))
    .unwrap();

    assert!(result.is_detected());

    // The detection reached flash.
    let recent = store.read_recent();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].detected_at, NOW);

    // The modem ran a complete PDU-mode handshake.
    let w = link.written();
    assert!(w.contains("AT+CMGF=0"));
    assert!(w.contains("AT+CMGS="));
    assert!(link.written_bytes().contains(&0x1A), "Ctrl-Z submitted");

    // Queues drained: every reaction job completed before poll_once
    // resolved, so nothing is left pending.
    assert_eq!(gsm_q.depth(), 0);
    assert_eq!(buzz_q.depth(), 0);
    assert_eq!(feed_q.depth(), 0);
}

#[test]
fn modem_rejection_degrades_but_other_reactions_complete() {
    let cfg = pipeline_config();

    let gsm_q = WorkQueue::new("gsm-q2");
    let _gsm = gsm_q.start(Core::Pro, 12, 64, "gsm-q2\0");
    let buzz_q = WorkQueue::new("buzz-q2");
    let _buzz = buzz_q.start(Core::App, 10, 64, "buzz-q2\0");
    let feed_q = WorkQueue::new("feed-q2");
    let _feed = feed_q.start(Core::App, 10, 64, "feed-q2\0");

    let link = ScriptedLink::new();
    link.push_response(b"ERROR\r\n"); // modem refuses PDU mode

    let mut imager = MockImager::with_uniform(33.0);
    let mut detector = MockDetector::new();
    detector.push_box(0.8);

    let mut store = DetectionLog::new(NvsAdapter::new().unwrap());
    let mut buzzer = QueuedBuzzer::new(buzz_q.clone());
    let mut dispenser = QueuedDispenser::new(feed_q.clone(), cfg.serving_run_ms);
    let mut notifier = SmsNotifier::new(
        gsm_q.clone(),
        ModemSmsTransport::new(link.clone(), ModemConfig::from(&cfg.sms)),
        &cfg.sms,
    );
    let mut sink = RecordingSink::new();

    let mut app = AppService::new(&cfg);
    let result = block_on(app.poll_once(
        &mut imager,
        &mut detector,
        &mut store,
        &mut buzzer,
        &mut dispenser,
        &mut notifier,
        &mut sink,
        NOW,
        &CancelToken::new(),
    ))
    .unwrap();

    // Detection stands; the failed alert only degrades the reaction.
    assert!(result.is_detected());
    assert!(sink.saw("ReactionDegraded"));

    // Persistence and actuators were unaffected by the modem failure.
    assert_eq!(store.read_recent().len(), 1);

    // No PDU content ever followed the rejected mode switch.
    assert!(!link.written().contains("AT+CMGS"));
}
