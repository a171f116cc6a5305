//! Scripted joypad used to drive demo sessions without real hardware.

use axon_types::binds::{JoyAxis, JoyButton};
use axon_types::device::JoypadSource;
use axon_types::AXIS_RANGE;

/// A pad whose state is a pure function of the frames polled so far.
///
/// Buttons follow short repeating patterns and the first axis sweeps a
/// triangle wave, so a session exercises both the digital and the analog
/// paths deterministically.
pub struct SyntheticPad {
    frame: u64,
}

impl SyntheticPad {
    pub fn new() -> SyntheticPad {
        SyntheticPad { frame: 0 }
    }

    fn level(&self, button: u16) -> bool {
        match button {
            0 => self.frame % 4 < 2,
            1 => self.frame % 7 == 0,
            2 => self.frame % 30 > 24,
            _ => false,
        }
    }

    /// Signed triangle wave over a 120-frame period, peaking at full range.
    fn sweep(&self) -> i16 {
        let phase = (self.frame % 120) as i32;
        let ramp = if phase < 60 { phase - 30 } else { 90 - phase };
        (ramp * i32::from(AXIS_RANGE) / 30) as i16
    }
}

impl Default for SyntheticPad {
    fn default() -> SyntheticPad {
        SyntheticPad::new()
    }
}

impl JoypadSource for SyntheticPad {
    fn poll(&mut self) {
        self.frame += 1;
    }

    fn name(&self) -> &str {
        "AXON Synthetic Pad"
    }

    fn button(&self, button: JoyButton) -> bool {
        match button {
            JoyButton::Button(n) => self.level(n),
            _ => false,
        }
    }

    fn axis(&self, axis: JoyAxis) -> i16 {
        match axis {
            JoyAxis::Pos(0) => self.sweep().max(0),
            JoyAxis::Neg(0) => self.sweep().min(0),
            _ => 0,
        }
    }
}
