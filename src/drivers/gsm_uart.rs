//! GSM modem serial link (SIM800L-class on UART1).
//!
//! Implements [`SerialLink`] over the ESP-IDF UART driver.  The modem
//! queue's single consumer is the only caller, so no locking happens
//! here — exclusivity is a property of the queue architecture.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: real UART driver (installed on first `open`).
//! On host/test: a scripted loopback — tests push canned modem
//! responses with [`sim_push_response`] and inspect what the firmware
//! wrote with [`sim_take_written`].

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
#[cfg(target_os = "espidf")]
use crate::pins;
use crate::sms::transport::SerialLink;

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;
#[cfg(not(target_os = "espidf"))]
use std::sync::Mutex;

/// Opaque link-layer failure; details go to the log at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GsmUartError;

pub struct GsmUart {
    baud: u32,
    opened: bool,
}

impl GsmUart {
    pub fn new(baud: u32) -> Self {
        Self {
            baud,
            opened: false,
        }
    }
}

// ── ESP-IDF backend ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl SerialLink for GsmUart {
    type Error = GsmUartError;

    fn open(&mut self) -> Result<(), GsmUartError> {
        if !self.opened {
            hw_init::uart_init(
                hw_init::UART_GSM,
                pins::GSM_UART_TX_GPIO,
                pins::GSM_UART_RX_GPIO,
                self.baud,
            )
            .map_err(|_| GsmUartError)?;
            self.opened = true;
        }
        // Modem boot banners and unsolicited notifications would
        // confuse the response scanner.
        hw_init::uart_purge_input(hw_init::UART_GSM);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), GsmUartError> {
        if hw_init::uart_write(hw_init::UART_GSM, data) {
            Ok(())
        } else {
            Err(GsmUartError)
        }
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, GsmUartError> {
        Ok(hw_init::uart_read(hw_init::UART_GSM, buf, timeout_ms))
    }

    fn close(&mut self) {
        // Driver stays installed; just drop anything unread so the next
        // transaction starts clean.
        hw_init::uart_purge_input(hw_init::UART_GSM);
    }
}

// ── Host simulation backend ───────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_RX: Mutex<VecDeque<Vec<u8>>> = Mutex::new(VecDeque::new());
#[cfg(not(target_os = "espidf"))]
static SIM_TX: Mutex<Vec<u8>> = Mutex::new(Vec::new());

/// Queue one modem response chunk for the next `read` call.
#[cfg(not(target_os = "espidf"))]
pub fn sim_push_response(bytes: &[u8]) {
    SIM_RX
        .lock()
        .expect("sim rx mutex poisoned")
        .push_back(bytes.to_vec());
}

/// Take (and clear) everything the firmware wrote to the modem.
#[cfg(not(target_os = "espidf"))]
pub fn sim_take_written() -> Vec<u8> {
    core::mem::take(&mut *SIM_TX.lock().expect("sim tx mutex poisoned"))
}

#[cfg(not(target_os = "espidf"))]
impl SerialLink for GsmUart {
    type Error = GsmUartError;

    fn open(&mut self) -> Result<(), GsmUartError> {
        let _ = self.baud;
        self.opened = true;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), GsmUartError> {
        SIM_TX
            .lock()
            .expect("sim tx mutex poisoned")
            .extend_from_slice(data);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, GsmUartError> {
        match SIM_RX.lock().expect("sim rx mutex poisoned").pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }

    fn close(&mut self) {
        self.opened = false;
    }
}
