//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions, LEDC timers/channels, the I2C master for
//! the thermal array, and the two UARTs (modem, vision module) using
//! raw ESP-IDF sys calls. Called once from `main()` before the event
//! loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed,
    I2cInitFailed(i32),
    UartInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed => write!(f, "LEDC timer/channel config failed"),
            Self::I2cInitFailed(rc) => write!(f, "I2C master init failed (rc={})", rc),
            Self::UartInitFailed(rc) => write!(f, "UART driver install failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// Peripheral unit assignments.
pub const LEDC_TIMER_BUZZER: u32 = 0;
pub const LEDC_TIMER_DISPENSER: u32 = 1;
pub const LEDC_CH_BUZZER: u32 = 0;
pub const LEDC_CH_DISPENSER: u32 = 1;
pub const I2C_PORT: i32 = 0;
pub const UART_GSM: u32 = 1;
pub const UART_VISION: u32 = 2;

/// Default FreeRTOS tick is 100 Hz.
#[cfg(target_os = "espidf")]
const TICK_MS: u32 = 10;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the event loop; single-threaded.
    unsafe {
        init_gpio_outputs()?;
        init_ledc();
        init_i2c()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [pins::DISPENSER_DIR_GPIO];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_gpio_outputs().
    unsafe {
        gpio_set_level(pin, if high { 1 } else { 0 });
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() {
    // Timer 0: buzzer — frequency is retuned per buzz() call.
    // SAFETY: Called from single main-task context via init_peripherals().
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::BUZZER_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    unsafe {
        ledc_timer_config(&timer0);
    }

    // Timer 1: dispenser motor (25 kHz, 8-bit).
    let timer1 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_1,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::DISPENSER_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    unsafe {
        ledc_timer_config(&timer1);
    }

    // Channel 0: buzzer PWM
    unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: ledc_channel_t_LEDC_CHANNEL_0,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: pins::BUZZER_PWM_GPIO,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        });
    }

    // Channel 1: dispenser PWM
    unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: ledc_channel_t_LEDC_CHANNEL_1,
            timer_sel: ledc_timer_t_LEDC_TIMER_1,
            gpio_num: pins::DISPENSER_PWM_GPIO,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        });
    }

    info!("hw_init: LEDC configured (buzzer=CH0, dispenser=CH1)");
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) {
    // SAFETY: LEDC channels were configured in init_ledc(); duty register
    // writes are race-free because each channel is driven by exactly one
    // queue-consumer thread.
    unsafe {
        esp_idf_svc::sys::ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty as u32);
        esp_idf_svc::sys::ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u8) {}

/// Retune a LEDC timer (buzzer tone changes).
#[cfg(target_os = "espidf")]
pub fn ledc_set_freq(timer: u32, freq_hz: u32) {
    // SAFETY: timer was configured in init_ledc(); single-writer per
    // timer (the buzzer queue consumer).
    unsafe {
        esp_idf_svc::sys::ledc_set_freq(ledc_mode_t_LEDC_LOW_SPEED_MODE, timer, freq_hz);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set_freq(_timer: u32, _freq_hz: u32) {}

// ── I2C master (thermal array) ───────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_i2c() -> Result<(), HwInitError> {
    let mut cfg: i2c_config_t = unsafe { core::mem::zeroed() };
    cfg.mode = i2c_mode_t_I2C_MODE_MASTER;
    cfg.sda_io_num = pins::I2C_SDA_GPIO;
    cfg.scl_io_num = pins::I2C_SCL_GPIO;
    cfg.sda_pullup_en = true;
    cfg.scl_pullup_en = true;
    cfg.__bindgen_anon_1.master.clk_speed = 400_000;

    let ret = unsafe { i2c_param_config(I2C_PORT, &cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::I2cInitFailed(ret));
    }
    let ret = unsafe { i2c_driver_install(I2C_PORT, i2c_mode_t_I2C_MODE_MASTER, 0, 0, 0) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::I2cInitFailed(ret));
    }

    info!("hw_init: I2C master ready (400 kHz)");
    Ok(())
}

/// Write `reg`, then read `buf.len()` bytes from a 7-bit device address.
#[cfg(target_os = "espidf")]
pub fn i2c_write_read(addr: u8, reg: u8, buf: &mut [u8]) -> bool {
    // SAFETY: the I2C driver was installed in init_i2c(); the thermal
    // sensor is the only device on the bus and has a single reader.
    let ret = unsafe {
        i2c_master_write_read_device(
            I2C_PORT,
            addr,
            &reg,
            1,
            buf.as_mut_ptr(),
            buf.len(),
            100 / TICK_MS,
        )
    };
    ret == ESP_OK as i32
}

#[cfg(not(target_os = "espidf"))]
pub fn i2c_write_read(_addr: u8, _reg: u8, _buf: &mut [u8]) -> bool {
    false
}

// ── UART (modem + vision module) ─────────────────────────────

/// Install a UART driver with an RX buffer; idempotent per port.
#[cfg(target_os = "espidf")]
pub fn uart_init(port: u32, tx_gpio: i32, rx_gpio: i32, baud: u32) -> Result<(), HwInitError> {
    let cfg = uart_config_t {
        baud_rate: baud as i32,
        data_bits: uart_word_length_t_UART_DATA_8_BITS,
        parity: uart_parity_t_UART_PARITY_DISABLE,
        stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
        flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
        ..Default::default()
    };

    // SAFETY: one-time setup per port from a single thread; the port is
    // afterwards owned by exactly one queue consumer / driver.
    unsafe {
        let ret = uart_driver_install(port as i32, 2048, 0, 0, core::ptr::null_mut(), 0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::UartInitFailed(ret));
        }
        let ret = uart_param_config(port as i32, &cfg);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::UartInitFailed(ret));
        }
        let ret = uart_set_pin(
            port as i32,
            tx_gpio,
            rx_gpio,
            UART_PIN_NO_CHANGE,
            UART_PIN_NO_CHANGE,
        );
        if ret != ESP_OK as i32 {
            return Err(HwInitError::UartInitFailed(ret));
        }
    }

    info!("hw_init: UART{} ready ({} baud)", port, baud);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_init(_port: u32, _tx: i32, _rx: i32, _baud: u32) -> Result<(), HwInitError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn uart_write(port: u32, data: &[u8]) -> bool {
    // SAFETY: driver installed in uart_init(); single writer per port.
    let written =
        unsafe { uart_write_bytes(port as i32, data.as_ptr().cast(), data.len()) };
    written >= 0 && written as usize == data.len()
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_write(_port: u32, _data: &[u8]) -> bool {
    true
}

/// Read whatever is buffered, waiting at most `timeout_ms`.
#[cfg(target_os = "espidf")]
pub fn uart_read(port: u32, buf: &mut [u8], timeout_ms: u32) -> usize {
    // SAFETY: driver installed in uart_init(); single reader per port.
    let n = unsafe {
        uart_read_bytes(
            port as i32,
            buf.as_mut_ptr().cast(),
            buf.len() as u32,
            timeout_ms.div_ceil(TICK_MS),
        )
    };
    if n < 0 { 0 } else { n as usize }
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_read(_port: u32, _buf: &mut [u8], _timeout_ms: u32) -> usize {
    0
}

/// Drop any stale bytes in the RX buffer (modem boot chatter).
#[cfg(target_os = "espidf")]
pub fn uart_purge_input(port: u32) {
    // SAFETY: driver installed in uart_init().
    unsafe {
        esp_idf_svc::sys::uart_flush_input(port as i32);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_purge_input(_port: u32) {}
