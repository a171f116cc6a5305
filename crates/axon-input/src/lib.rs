//! The AXON input pipeline.
//!
//! Everything between raw devices and the values an emulated core reads:
//! keybind resolution with autoconfig fallback, per-port button/analog
//! remapping, analog deadzone and sensitivity shaping, turbo fire, hotkey
//! arbitration between a pad and a keyboard, touch-overlay processing, the
//! remote and command injection feeds, and the [`context::InputContext`]
//! aggregator that merges them all per frame and taps or substitutes movie
//! data around the result.

pub mod analog;
pub mod binds_store;
pub mod command;
pub mod context;
pub mod hotkey;
pub mod keyboard;
pub mod mapper;
pub mod overlay;
pub mod remap;
pub mod remote;
pub mod turbo;

pub use binds_store::{AutoconfProfile, KeybindStore};
pub use context::InputContext;
pub use overlay::OverlaySet;
pub use remap::{RemapTables, RemapTarget};
