//! SMS alert notifier adapter.
//!
//! Implements [`AlertNotifierPort`] on top of the modem work queue:
//! rendering the alert text is done inline (cheap), but the serial
//! handshake itself is enqueued as a job for the `gsm-q` consumer, the
//! only thread allowed to touch the modem UART.  The port future
//! resolves when the queued send has finished.
//!
//! A minimum-interval guard keeps a rat camping in front of the camera
//! from burning through the SIM plan; suppressed alerts are logged and
//! counted, not errors.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::adapters::time::format_unix_utc;
use crate::app::ports::AlertNotifierPort;
use crate::config::{SmsConfig, MAX_RECIPIENTS};
use crate::error::Result;
use crate::queue::WorkQueue;
use crate::sms::pdu::PhoneNumber;
use crate::sms::transport::{ModemSmsTransport, SerialLink};

/// Queue-backed SMS notifier.
pub struct SmsNotifier<L: SerialLink + Send + 'static> {
    queue: WorkQueue,
    transport: Arc<Mutex<ModemSmsTransport<L>>>,
    recipients: heapless::Vec<PhoneNumber, MAX_RECIPIENTS>,
    template: heapless::String<96>,
    min_interval: Duration,
    last_alert: Option<Instant>,
    suppressed: u32,
}

impl<L: SerialLink + Send + 'static> SmsNotifier<L> {
    pub fn new(queue: WorkQueue, transport: ModemSmsTransport<L>, cfg: &SmsConfig) -> Self {
        Self {
            queue,
            transport: Arc::new(Mutex::new(transport)),
            recipients: cfg.recipients.clone(),
            template: cfg.template.clone(),
            min_interval: Duration::from_secs(u64::from(cfg.min_alert_interval_secs)),
            last_alert: None,
            suppressed: 0,
        }
    }

    /// Alerts suppressed by the interval guard since boot.
    pub fn suppressed(&self) -> u32 {
        self.suppressed
    }

    fn render(&self, detection_count: u32, detected_at: u64) -> String {
        self.template
            .as_str()
            .replace("{count}", &detection_count.to_string())
            .replace("{time}", format_unix_utc(detected_at).as_str())
    }
}

impl<L: SerialLink + Send + 'static> AlertNotifierPort for SmsNotifier<L> {
    async fn notify(&mut self, detection_count: u32, detected_at: u64) -> Result<()> {
        if self.recipients.is_empty() {
            info!("sms: no recipients configured, alert dropped");
            return Ok(());
        }

        if let Some(last) = self.last_alert {
            if last.elapsed() < self.min_interval {
                self.suppressed += 1;
                info!(
                    "sms: alert suppressed by interval guard ({} so far)",
                    self.suppressed
                );
                return Ok(());
            }
        }

        let text = self.render(detection_count, detected_at);
        let transport = self.transport.clone();
        let recipients: Vec<PhoneNumber> = self.recipients.iter().copied().collect();

        let handle = self.queue.enqueue_with_handle(Box::new(move |cancel| {
            // Uncontended: only the gsm-q consumer executes modem jobs.
            let mut t = transport
                .lock()
                .expect("modem transport mutex poisoned");
            t.send_to_all(&recipients, &text, cancel)
        }))?;

        // Sent (well, queued and executed); start the quiet window now
        // so a burst of detections collapses into one text.
        self.last_alert = Some(Instant::now());

        let result = handle.wait().await;
        if let Err(e) = result {
            warn!("sms: alert delivery failed: {e}");
            return Err(e);
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────
