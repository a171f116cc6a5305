//! Transient remap overrides, rebuilt every poll.
//!
//! The poll pass walks the remap tables and deposits the redirected state
//! here: bind bits for button targets, half-axis magnitudes for analog
//! targets, and injected keyboard keys. Queries then merge this scratch
//! state with the directly-read device state. Nothing survives a poll.

use axon_types::binds::{BindId, BindMask};
use axon_types::keys::Key;
use axon_types::MAX_PORTS;

/// Number of analog half-axis slots per port.
pub const ANALOG_SLOTS: usize = 8;

/// Half-axis slot of an analog bind, `None` for everything else.
pub fn analog_slot(id: BindId) -> Option<usize> {
    id.is_analog().then(|| id.index() - BindId::LeftXPlus.index())
}

/// Per-poll remap output.
#[derive(Debug)]
pub struct InputMapper {
    buttons: [BindMask; MAX_PORTS],
    analog: [[i16; ANALOG_SLOTS]; MAX_PORTS],
    keys: Vec<Key>,
}

impl Default for InputMapper {
    fn default() -> InputMapper {
        InputMapper::new()
    }
}

impl InputMapper {
    pub fn new() -> InputMapper {
        InputMapper {
            buttons: [BindMask::EMPTY; MAX_PORTS],
            analog: [[0; ANALOG_SLOTS]; MAX_PORTS],
            keys: Vec::new(),
        }
    }

    /// Wipe all overrides. Called at the top of every poll.
    pub fn clear(&mut self) {
        self.buttons = [BindMask::EMPTY; MAX_PORTS];
        self.analog = [[0; ANALOG_SLOTS]; MAX_PORTS];
        self.keys.clear();
    }

    /// Mark a redirected bind pressed on a virtual port.
    pub fn set_button(&mut self, port: usize, id: BindId) {
        if let Some(mask) = self.buttons.get_mut(port) {
            mask.set(id);
        }
    }

    pub fn button_pressed(&self, port: usize, id: BindId) -> bool {
        self.buttons
            .get(port)
            .map(|mask| mask.contains(id))
            .unwrap_or(false)
    }

    /// Deposit a half-axis magnitude, keeping the larger of the two when
    /// several sources land on the same slot.
    pub fn set_analog(&mut self, port: usize, slot: usize, magnitude: i16) {
        if let Some(row) = self.analog.get_mut(port) {
            if let Some(value) = row.get_mut(slot) {
                if magnitude.unsigned_abs() > value.unsigned_abs() {
                    *value = magnitude;
                }
            }
        }
    }

    pub fn analog(&self, port: usize, slot: usize) -> i16 {
        self.analog
            .get(port)
            .and_then(|row| row.get(slot))
            .copied()
            .unwrap_or(0)
    }

    /// Inject a keyboard key for this frame.
    pub fn set_key(&mut self, key: Key) {
        if key != Key::None && !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_wipes_everything() {
        let mut mapper = InputMapper::new();
        mapper.set_button(1, BindId::A);
        mapper.set_analog(0, 2, 9000);
        mapper.set_key(Key::Q);
        mapper.clear();
        assert!(!mapper.button_pressed(1, BindId::A));
        assert_eq!(mapper.analog(0, 2), 0);
        assert!(!mapper.key_pressed(Key::Q));
    }

    #[test]
    fn analog_keeps_the_larger_magnitude() {
        let mut mapper = InputMapper::new();
        mapper.set_analog(0, 0, 5000);
        mapper.set_analog(0, 0, -12000);
        assert_eq!(mapper.analog(0, 0), -12000);
        mapper.set_analog(0, 0, 3000);
        assert_eq!(mapper.analog(0, 0), -12000);
    }

    #[test]
    fn out_of_range_access_is_neutral() {
        let mut mapper = InputMapper::new();
        mapper.set_button(MAX_PORTS + 1, BindId::A);
        mapper.set_analog(0, ANALOG_SLOTS + 1, 100);
        assert!(!mapper.button_pressed(MAX_PORTS + 1, BindId::A));
        assert_eq!(mapper.analog(0, ANALOG_SLOTS + 1), 0);
    }

    #[test]
    fn analog_slots_cover_the_half_axes() {
        assert_eq!(analog_slot(BindId::LeftXPlus), Some(0));
        assert_eq!(analog_slot(BindId::LeftXMinus), Some(1));
        assert_eq!(analog_slot(BindId::RightYMinus), Some(7));
        assert_eq!(analog_slot(BindId::B), None);
        assert_eq!(analog_slot(BindId::TurboEnable), None);
    }

    #[test]
    fn none_key_is_never_stored() {
        let mut mapper = InputMapper::new();
        mapper.set_key(Key::None);
        assert!(!mapper.key_pressed(Key::None));
    }
}
