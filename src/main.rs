//! RatSentry Firmware — Main Entry Point
//!
//! Hexagonal architecture with event-driven execution and one dedicated
//! queue consumer per physical resource.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ThermalAdapter  VisionAdapter   NvsAdapter     LogEventSink   │
//! │  (Grid-EYE I2C)  (camera UART2)  (Config+NVS)   (EventSink)    │
//! │  QueuedBuzzer    QueuedDispenser SmsNotifier    DetectionLog   │
//! │  (buzz-q→PWM)    (feed-q→PWM)    (gsm-q→UART1)  (NVS ring)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  DetectionEngine · DetectionResultHandler              │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  WorkQueues (gsm-q · buzz-q · feed-q) · hw timers · watchdog   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use ratsentry::adapters::detection_log::DetectionLog;
use ratsentry::adapters::hardware::{
    QueuedBuzzer, QueuedDispenser, ThermalAdapter, VisionAdapter,
};
use ratsentry::adapters::log_sink::LogEventSink;
use ratsentry::adapters::nvs::NvsAdapter;
use ratsentry::adapters::sms_notifier::SmsNotifier;
use ratsentry::adapters::time::Esp32TimeAdapter;
use ratsentry::app::events::AppEvent;
use ratsentry::app::ports::{ConfigPort, EventSink};
use ratsentry::app::service::AppService;
use ratsentry::config::SystemConfig;
use ratsentry::diagnostics::CrashLog;
use ratsentry::drivers::gsm_uart::GsmUart;
use ratsentry::drivers::task_pin::Core;
use ratsentry::drivers::watchdog::Watchdog;
use ratsentry::drivers::{hw_init, hw_timer};
use ratsentry::events::{drain_events, Event};
use ratsentry::pins;
use ratsentry::queue::{CancelToken, WorkQueue};
use ratsentry::sensors::thermal::ThermalImager;
use ratsentry::sensors::vision::VisionModule;
use ratsentry::diagnostics;
use ratsentry::sms::transport::{ModemConfig, ModemSmsTransport};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RatSentry v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    diagnostics::install_panic_handler();

    // ── 1b. Initialise hardware peripherals ───────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        // In production this triggers the watchdog reset after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    let watchdog = Watchdog::new();

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            // Continue without NVS — config will not be persisted this
            // session.  On next reboot, NVS should self-heal.
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 2b. Previous-boot crash report ────────────────────────
    {
        let mut crash_log = CrashLog::new();
        crash_log.init(&nvs);
        let entries = crash_log.read_all(&nvs);
        if !entries.is_empty() {
            warn!("{} crash entrie(s) from previous runs:", entries.len());
            for e in entries.iter() {
                warn!("  [{}s] {}", e.uptime_secs, e.reason.as_str());
            }
        }
    }

    let time = Esp32TimeAdapter::new();

    // ── 3. Work queues — one consumer per physical resource ───
    let gsm_q = WorkQueue::new("gsm-q");
    let _gsm_consumer = gsm_q.start(Core::Pro, 12, 16, "gsm-q\0");
    let buzz_q = WorkQueue::new("buzz-q");
    let _buzz_consumer = buzz_q.start(Core::App, 10, 8, "buzz-q\0");
    let feed_q = WorkQueue::new("feed-q");
    let _feed_consumer = feed_q.start(Core::App, 10, 8, "feed-q\0");

    // ── 4. Construct adapters ─────────────────────────────────
    let mut thermal = ThermalAdapter::new(ThermalImager::new(pins::AMG8833_ADDR));
    let mut vision = VisionAdapter::new(VisionModule::new());
    let mut buzzer = QueuedBuzzer::new(buzz_q.clone());
    let mut dispenser = QueuedDispenser::new(feed_q.clone(), config.serving_run_ms);

    let modem = ModemSmsTransport::new(
        GsmUart::new(config.sms.baud),
        ModemConfig::from(&config.sms),
    );
    let mut notifier: SmsNotifier<GsmUart> = SmsNotifier::new(gsm_q.clone(), modem, &config.sms);
    if config.sms.recipients.is_empty() {
        warn!("No SMS recipients configured — detections will not alert anyone");
    } else {
        for r in config.sms.recipients.iter() {
            info!("SMS recipient: {}", r);
        }
    }

    let mut store = DetectionLog::new(match NvsAdapter::new() {
        Ok(n) => n,
        Err(_) => NvsAdapter::default(),
    });
    let mut sink = LogEventSink::new();

    // ── 5. Construct app service ──────────────────────────────
    let mut app = AppService::new(&config);
    app.start(&mut sink);

    // ── 6. Tick timers ────────────────────────────────────────
    hw_timer::start_timers(config.poll_interval_ms, config.telemetry_interval_secs);
    info!(
        "System ready. Poll every {} ms, alerts ≥ {} s apart.",
        config.poll_interval_ms, config.sms.min_alert_interval_secs
    );

    // ── 7. Event loop ─────────────────────────────────────────
    let poll_cancel = CancelToken::new();
    let mut last_suppressed: u32 = 0;

    #[cfg(not(target_os = "espidf"))]
    let mut telemetry_elapsed_ms: u64 = 0;

    loop {
        // Simulate timer interrupts via sleep on non-espidf targets.
        // On real hardware, esp_timer callbacks push the tick events.
        #[cfg(not(target_os = "espidf"))]
        {
            std::thread::sleep(std::time::Duration::from_millis(
                config.poll_interval_ms as u64,
            ));
            ratsentry::events::push_event(Event::SensorPollTick);
            telemetry_elapsed_ms += config.poll_interval_ms as u64;
            if telemetry_elapsed_ms >= u64::from(config.telemetry_interval_secs) * 1000 {
                ratsentry::events::push_event(Event::TelemetryTick);
                telemetry_elapsed_ms = 0;
            }
        }

        // Process all pending events.
        drain_events(|event| match event {
            Event::SensorPollTick => {
                let now = time.unix_secs();
                let outcome = futures_lite::future::block_on(app.poll_once(
                    &mut thermal,
                    &mut vision,
                    &mut store,
                    &mut buzzer,
                    &mut dispenser,
                    &mut notifier,
                    &mut sink,
                    now,
                    &poll_cancel,
                ));
                if let Err(e) = outcome {
                    // Sensor faults are per-poll; the next tick retries
                    // the whole cycle from scratch.
                    warn!("Poll failed: {e}");
                }

                let suppressed = notifier.suppressed();
                if suppressed > last_suppressed {
                    last_suppressed = suppressed;
                    sink.emit(&AppEvent::AlertRateLimited);
                }
            }

            Event::TelemetryTick => {
                let t = app.build_telemetry(gsm_q.depth(), buzz_q.depth(), feed_q.depth());
                sink.emit(&AppEvent::Telemetry(t));
            }

            Event::WatchdogTick => {
                // Fed below on every loop iteration anyway.
            }
        });

        // Feed watchdog on every iteration.
        watchdog.feed();

        // Idle pacing between timer events on real hardware.
        #[cfg(target_os = "espidf")]
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
}
