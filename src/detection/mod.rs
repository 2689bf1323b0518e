//! Detection pipeline: sensor fusion and reaction fan-out.
//!
//! [`engine`] turns one thermal frame + one vision result into a
//! [`types::DetectionResult`]; [`handler`] reacts to positive results
//! through the reaction ports.  Everything here is hardware-free and
//! runs identically on host and device.

pub mod engine;
pub mod handler;
pub mod types;
