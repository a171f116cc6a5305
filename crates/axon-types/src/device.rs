//! Device capability traits.
//!
//! Platform layers implement these traits to feed the pipeline; everything
//! above them is platform-agnostic. Null implementations are provided so a
//! missing device degrades to "nothing pressed" instead of a special case.

use serde::{Deserialize, Serialize};

use crate::binds::{BindId, JoyAxis, JoyButton, Keybind};
use crate::keys::{Key, KeyEvent};
use crate::AXIS_RANGE;

// ---- query addressing ----

/// Device class named in an aggregator query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum DeviceClass {
    None = 0,
    Joypad = 1,
    Keyboard = 3,
    Analog = 5,
    Pointer = 6,
}

impl DeviceClass {
    pub fn from_u32(raw: u32) -> DeviceClass {
        match raw {
            1 => DeviceClass::Joypad,
            3 => DeviceClass::Keyboard,
            5 => DeviceClass::Analog,
            6 => DeviceClass::Pointer,
            _ => DeviceClass::None,
        }
    }
}

/// Joypad query id that requests all 16 digital buttons as a packed mask.
pub const ID_JOYPAD_MASK: u32 = 256;

/// Analog query indices.
pub const INDEX_ANALOG_LEFT: u32 = 0;
pub const INDEX_ANALOG_RIGHT: u32 = 1;
pub const INDEX_ANALOG_BUTTON: u32 = 2;

/// Analog query ids within a stick index.
pub const ID_ANALOG_X: u32 = 0;
pub const ID_ANALOG_Y: u32 = 1;

/// Pointer query ids.
pub const ID_POINTER_X: u32 = 0;
pub const ID_POINTER_Y: u32 = 1;
pub const ID_POINTER_PRESSED: u32 = 2;

// ---- rumble ----

/// The two motors of a dual-motor rumble pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RumbleEffect {
    Strong,
    Weak,
}

// ---- pointer buttons ----

/// Buttons reported by mice and other pointer devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    WheelUp,
    WheelDown,
}

// ---- capability traits ----

/// A physical game controller.
///
/// `poll` snapshots the device once per frame; the read methods then report
/// from that snapshot so every consumer sees the same state within a frame.
pub trait JoypadSource {
    /// Refresh the internal snapshot. Called once per frame.
    fn poll(&mut self);

    /// Human-readable device name, used for autoconfig matching and logs.
    fn name(&self) -> &str;

    /// Digital state of a button or hat direction.
    fn button(&self, button: JoyButton) -> bool;

    /// Signed position of a half-axis, 0 when the bind points the wrong way.
    fn axis(&self, axis: JoyAxis) -> i16;

    /// Drive a rumble motor. Returns `false` when unsupported.
    fn set_rumble(&mut self, _effect: RumbleEffect, _strength: u16) -> bool {
        false
    }

    /// Whether a bind's joystick sources are active on this device.
    fn bind_pressed(&self, bind: &Keybind, axis_threshold: f32) -> bool {
        if !bind.valid {
            return false;
        }
        if self.button(bind.joy_button) {
            return true;
        }
        let value = self.axis(bind.joy_axis);
        f32::from(value.unsigned_abs()) > axis_threshold * f32::from(AXIS_RANGE)
    }

    /// Digital state of the 16 pad buttons for a bind set, packed LSB-first.
    fn button_mask(&self, binds: &[Keybind], axis_threshold: f32) -> u16 {
        let mut mask = 0u16;
        for (i, bind) in binds.iter().take(BindId::PAD_BUTTONS).enumerate() {
            if self.bind_pressed(bind, axis_threshold) {
                mask |= 1 << i;
            }
        }
        mask
    }
}

/// A keyboard.
///
/// `poll` drains the transitions seen since the previous poll; `pressed`
/// reports level state for bind evaluation.
pub trait KeyboardSource {
    fn poll(&mut self) -> Vec<KeyEvent>;
    fn pressed(&self, key: Key) -> bool;
}

/// An absolute pointer surface (touchscreen or mouse).
///
/// Coordinates are normalized to `-0x7FFF..=0x7FFF` in both dimensions.
pub trait PointerSource {
    /// Refresh the internal snapshot. Called once per frame.
    fn poll(&mut self);

    /// Number of active touch points.
    fn count(&self) -> usize;

    /// Position of touch point `index`.
    fn position(&self, index: usize) -> (i16, i16);

    /// Whether touch point `index` is in contact.
    fn pressed(&self, index: usize) -> bool;

    /// Digital state of a pointer button.
    fn button(&self, button: PointerButton) -> bool;
}

// ---- null devices ----

/// Joypad stand-in used when a port has no physical device.
#[derive(Debug, Default)]
pub struct NullJoypad;

impl JoypadSource for NullJoypad {
    fn poll(&mut self) {}

    fn name(&self) -> &str {
        "null"
    }

    fn button(&self, _button: JoyButton) -> bool {
        false
    }

    fn axis(&self, _axis: JoyAxis) -> i16 {
        0
    }
}

/// Keyboard stand-in that never reports anything.
#[derive(Debug, Default)]
pub struct NullKeyboard;

impl KeyboardSource for NullKeyboard {
    fn poll(&mut self) -> Vec<KeyEvent> {
        Vec::new()
    }

    fn pressed(&self, _key: Key) -> bool {
        false
    }
}

/// Pointer stand-in with no touch points.
#[derive(Debug, Default)]
pub struct NullPointer;

impl PointerSource for NullPointer {
    fn poll(&mut self) {}

    fn count(&self) -> usize {
        0
    }

    fn position(&self, _index: usize) -> (i16, i16) {
        (0, 0)
    }

    fn pressed(&self, _index: usize) -> bool {
        false
    }

    fn button(&self, _button: PointerButton) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneButtonPad;

    impl JoypadSource for OneButtonPad {
        fn poll(&mut self) {}

        fn name(&self) -> &str {
            "one-button"
        }

        fn button(&self, button: JoyButton) -> bool {
            button == JoyButton::Button(3)
        }

        fn axis(&self, axis: JoyAxis) -> i16 {
            match axis {
                JoyAxis::Pos(0) => 0x7000,
                _ => 0,
            }
        }
    }

    #[test]
    fn null_devices_report_nothing() {
        let mut pad = NullJoypad;
        pad.poll();
        assert!(!pad.button(JoyButton::Button(0)));
        assert_eq!(pad.axis(JoyAxis::Pos(0)), 0);
        assert!(!pad.set_rumble(RumbleEffect::Strong, 0xFFFF));

        let mut kb = NullKeyboard;
        assert!(kb.poll().is_empty());
        assert!(!kb.pressed(Key::A));

        let ptr = NullPointer;
        assert_eq!(ptr.count(), 0);
        assert!(!ptr.pressed(0));
    }

    #[test]
    fn bind_pressed_checks_button_and_axis() {
        let pad = OneButtonPad;
        let mut bind = Keybind { joy_button: JoyButton::Button(3), valid: true, ..Keybind::unbound() };
        assert!(pad.bind_pressed(&bind, 0.5));

        bind.joy_button = JoyButton::Button(4);
        assert!(!pad.bind_pressed(&bind, 0.5));

        bind.joy_axis = JoyAxis::Pos(0);
        assert!(pad.bind_pressed(&bind, 0.5));
        assert!(!pad.bind_pressed(&bind, 0.95));

        bind.valid = false;
        assert!(!pad.bind_pressed(&bind, 0.5));
    }

    #[test]
    fn button_mask_packs_lsb_first() {
        let pad = OneButtonPad;
        let mut binds = vec![Keybind::unbound(); BindId::COUNT];
        binds[BindId::A.index()] =
            Keybind { joy_button: JoyButton::Button(3), valid: true, ..Keybind::unbound() };
        let mask = pad.button_mask(&binds, 0.5);
        assert_eq!(mask, 1 << BindId::A.index());
    }

    #[test]
    fn device_class_from_u32() {
        assert_eq!(DeviceClass::from_u32(1), DeviceClass::Joypad);
        assert_eq!(DeviceClass::from_u32(5), DeviceClass::Analog);
        assert_eq!(DeviceClass::from_u32(99), DeviceClass::None);
    }
}
