//! Unified error types for the RatSentry firmware.
//!
//! Follows embedded best practice: a single `Error` enum that every subsystem
//! can convert into, keeping the top-level control loop's error handling uniform.
//! All variants are `Copy` so they can be cheaply carried through work-queue
//! completion signals and the detection handler without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned out-of-range data.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// SMS PDU encoding failed (bad character, oversize message).
    Encode(EncodeError),
    /// The GSM modem handshake failed.
    Modem(ModemError),
    /// A work queue rejected or lost an item.
    Queue(QueueError),
    /// Persistent storage (NVS) failed.
    Storage(&'static str),
    /// The operation was cancelled before it ran.
    Cancelled,
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Encode(e) => write!(f, "encode: {e}"),
            Self::Modem(e) => write!(f, "modem: {e}"),
            Self::Queue(e) => write!(f, "queue: {e}"),
            Self::Storage(msg) => write!(f, "storage: {msg}"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I2C transaction with the thermal array failed.
    I2cReadFailed,
    /// Vision module returned a malformed or truncated result.
    VisionProtocol,
    /// Vision module did not answer within its deadline.
    VisionTimeout,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2cReadFailed => write!(f, "I2C read failed"),
            Self::VisionProtocol => write!(f, "vision result malformed"),
            Self::VisionTimeout => write!(f, "vision module timeout"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// PWM duty or frequency write failed.
    PwmWriteFailed,
    /// GPIO set failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// SMS encoding errors
// ---------------------------------------------------------------------------

/// Validation failures from the PDU encoder.  Fatal to the whole message:
/// the caller gets no frames, and nothing reaches the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// A character has no GSM-7 default-alphabet mapping.
    UnmappableChar(char),
    /// Splitting the text would exceed 255 concatenated parts.
    TooManyParts,
    /// An internal bounded buffer overflowed (destination or PDU hex).
    BufferOverflow,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmappableChar(c) => write!(f, "no GSM-7 mapping for {c:?}"),
            Self::TooManyParts => write!(f, "more than 255 message parts"),
            Self::BufferOverflow => write!(f, "PDU buffer overflow"),
        }
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Self::Encode(e)
    }
}

// ---------------------------------------------------------------------------
// Modem transport errors
// ---------------------------------------------------------------------------

/// Stage of the AT-command handshake, carried in modem errors so the log
/// shows exactly where a send died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStage {
    /// Opening the serial port / settle delay.
    Open,
    /// `AT+CMGF=0` — entering PDU mode.
    SetPduMode,
    /// `AT+CMGS=<n>` — announcing the frame size.
    SetSize,
    /// Hex PDU + Ctrl-Z — submitting the frame.
    SendContent,
}

impl fmt::Display for TxStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::SetPduMode => write!(f, "AT+CMGF"),
            Self::SetSize => write!(f, "AT+CMGS"),
            Self::SendContent => write!(f, "send-content"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemError {
    /// The underlying serial link failed to open or transfer bytes.
    Link,
    /// The modem answered "ERROR" at the given stage.
    ErrorResponse(TxStage),
    /// No recognised response within the configured deadline.
    Timeout(TxStage),
}

impl fmt::Display for ModemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link => write!(f, "serial link failure"),
            Self::ErrorResponse(s) => write!(f, "ERROR during {s}"),
            Self::Timeout(s) => write!(f, "timeout during {s}"),
        }
    }
}

impl From<ModemError> for Error {
    fn from(e: ModemError) -> Self {
        Self::Modem(e)
    }
}

// ---------------------------------------------------------------------------
// Work queue errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The bounded queue is full; the item was rejected at enqueue time.
    Full,
    /// The cancellation registry is full; the item was rejected rather
    /// than accepted without a working cancel handle.
    RegistryFull,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "queue full"),
            Self::RegistryFull => write!(f, "cancel registry full"),
        }
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
