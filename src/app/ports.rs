//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ detection core
//! ```
//!
//! Driven adapters (sensors, actuators, the SMS notifier, storage)
//! implement these traits.  The detection service and handler consume
//! them via generics, so the domain core never touches hardware
//! directly and every port can be mocked on the host.
//!
//! Reaction ports are `async`: their hardware adapters enqueue onto the
//! per-resource work queues and resolve when the queued command has
//! actually run, which is what lets the handler fan out four reactions
//! concurrently and await them jointly.

#![allow(async_fn_in_trait)] // ports are consumed via generics, never dyn

use crate::config::SystemConfig;
use crate::detection::types::{DetectionRecord, ThermalFrame, VisionResult};
use crate::error::Result;

// ───────────────────────────────────────────────────────────────
// Sensing ports (driven adapters: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Thermal imager: one temperature grid per poll.
pub trait ThermalImagerPort {
    fn read_frame(&mut self) -> Result<ThermalFrame>;
}

/// Vision module: capture + opaque inference, boxes out.
pub trait ObjectDetectorPort {
    fn process(&mut self) -> Result<VisionResult>;
}

// ───────────────────────────────────────────────────────────────
// Reaction ports (driven adapters: domain → hardware / outside)
// ───────────────────────────────────────────────────────────────

/// Persists positive detections.
pub trait RecordsStorePort {
    async fn add_detection(&mut self, record: &DetectionRecord) -> Result<()>;
}

/// Sounds the deterrent buzzer.
pub trait BuzzerPort {
    async fn buzz(&mut self, tone_hz: u16, duration_ms: u32) -> Result<()>;
}

/// Runs the bait auger.
pub trait DispenserPort {
    async fn dispense(&mut self, servings: u8) -> Result<()>;
}

/// Delivers a detection alert to the configured recipients.
pub trait AlertNotifierPort {
    async fn notify(&mut self, detection_count: u32, detected_at: u64) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log,
/// future MQTT uplink, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped — an empty thermal band or a zero response
/// timeout would quietly disable detection or hang diagnosis.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> core::result::Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> core::result::Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Raw namespaced blob storage (NVS on the device, a map in tests).
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(
        &self,
        namespace: &str,
        key: &str,
        buf: &mut [u8],
    ) -> core::result::Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(
        &mut self,
        namespace: &str,
        key: &str,
        data: &[u8],
    ) -> core::result::Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> core::result::Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
