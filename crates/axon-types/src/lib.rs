//! Foundation types for AXON.
//!
//! This crate contains the platform-agnostic core types shared by all AXON
//! crates: canonical key codes, the bind table, keybind types and their text
//! codecs, device capability traits, settings, and error types.

pub mod binds;
pub mod device;
pub mod error;
pub mod keys;
pub mod settings;

/// Number of logical (virtual) controller ports.
///
/// Also the sentinel value terminating port-map rows: a physical-port entry
/// equal to `MAX_PORTS` means "no further contributors".
pub const MAX_PORTS: usize = 8;

/// Maximum simultaneous touch points tracked by the overlay processor.
pub const MAX_TOUCHES: usize = 16;

/// Full-scale magnitude of an analog axis sample.
pub const AXIS_RANGE: i16 = 0x7FFF;
