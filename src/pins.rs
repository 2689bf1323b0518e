//! GPIO / peripheral pin assignments for the RatSentry main board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Buzzer (passive piezo, driven through an S8050 transistor)
// ---------------------------------------------------------------------------

/// LEDC PWM output for the piezo element.  Tone frequency is set on the
/// LEDC timer, duty is fixed at 50 % while sounding.
pub const BUZZER_PWM_GPIO: i32 = 1;

// ---------------------------------------------------------------------------
// Bait dispenser (auger motor, DRV8871 H-bridge)
// ---------------------------------------------------------------------------

/// LEDC PWM channel for auger motor speed.
pub const DISPENSER_PWM_GPIO: i32 = 2;
/// Digital output: HIGH = forward (dispense), LOW = reverse (unjam).
pub const DISPENSER_DIR_GPIO: i32 = 3;

// ---------------------------------------------------------------------------
// Thermal imager (AMG8833 Grid-EYE, I2C address 0x69)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 14;
pub const I2C_SCL_GPIO: i32 = 15;
/// 7-bit I2C address of the Grid-EYE (AD_SELECT tied high).
pub const AMG8833_ADDR: u8 = 0x69;

// ---------------------------------------------------------------------------
// Vision module (AI camera, detection results over UART2)
// ---------------------------------------------------------------------------

pub const VISION_UART_TX_GPIO: i32 = 17;
pub const VISION_UART_RX_GPIO: i32 = 18;
/// Vision module link speed.
pub const VISION_UART_BAUD: u32 = 921_600;

// ---------------------------------------------------------------------------
// GSM modem (SIM800L-class, UART1)
// ---------------------------------------------------------------------------

pub const GSM_UART_TX_GPIO: i32 = 4;
pub const GSM_UART_RX_GPIO: i32 = 5;
/// Default modem link speed; overridable via `SystemConfig`.
pub const GSM_UART_BAUD: u32 = 115_200;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC base frequency for the dispenser motor (25 kHz — inaudible).
pub const DISPENSER_PWM_FREQ_HZ: u32 = 25_000;
/// Initial LEDC frequency for the buzzer timer; retuned per buzz call.
pub const BUZZER_PWM_FREQ_HZ: u32 = 2_000;
