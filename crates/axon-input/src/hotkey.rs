//! Hotkey gating.
//!
//! The enable-hotkey modifier lets one physical control serve double duty:
//! while it is held, hotkeys fire and standard controls are muted; while it
//! is not, hotkeys sharing a device with the modifier are muted instead.
//! Which side gets muted depends on where the modifier is bound, so pad-only
//! and keyboard-only setups keep their other device unrestricted.

use axon_types::binds::BindId;

/// Where the enable-hotkey modifier is bound and whether it is held,
/// sampled once per frame by the aggregator.
#[derive(Debug, Clone, Copy, Default)]
pub struct HotkeyInputs {
    /// A joystick source is assigned to the modifier (configured or
    /// autoconfigured).
    pub pad_bound: bool,
    /// A keyboard key is assigned to the modifier.
    pub keyboard_bound: bool,
    pub pad_held: bool,
    pub keyboard_held: bool,
}

/// Per-frame blocking decisions derived from the modifier state.
#[derive(Debug, Default)]
pub struct HotkeyArbitrator {
    block_counter: u8,
    standard_blocked: bool,
    keyboard_hotkeys_blocked: bool,
    pad_hotkeys_blocked: bool,
}

impl HotkeyArbitrator {
    pub fn new() -> HotkeyArbitrator {
        HotkeyArbitrator::default()
    }

    /// Recompute the blocking flags for a new frame.
    ///
    /// `block_delay` is the number of frames the modifier must stay held
    /// before standard controls are muted, which keeps a quick tap from
    /// eating a frame of game input.
    pub fn update(&mut self, inputs: HotkeyInputs, block_delay: u8) {
        self.standard_blocked = false;
        self.keyboard_hotkeys_blocked = false;
        self.pad_hotkeys_blocked = false;

        match (inputs.pad_bound, inputs.keyboard_bound) {
            (true, true) => {
                if inputs.pad_held || inputs.keyboard_held {
                    self.count_held_frame(block_delay);
                } else {
                    self.block_counter = 0;
                    self.keyboard_hotkeys_blocked = true;
                    self.pad_hotkeys_blocked = true;
                }
            }
            (true, false) => {
                if inputs.pad_held {
                    self.count_held_frame(block_delay);
                } else {
                    self.block_counter = 0;
                    self.pad_hotkeys_blocked = true;
                }
            }
            (false, true) => {
                if inputs.keyboard_held {
                    self.count_held_frame(block_delay);
                } else {
                    self.block_counter = 0;
                    self.keyboard_hotkeys_blocked = true;
                }
            }
            (false, false) => {
                self.block_counter = 0;
            }
        }
    }

    fn count_held_frame(&mut self, block_delay: u8) {
        if self.block_counter < block_delay {
            self.block_counter += 1;
        } else {
            self.standard_blocked = true;
        }
    }

    /// Whether core-visible controls are muted this frame.
    pub fn standard_blocked(&self) -> bool {
        self.standard_blocked
    }

    /// Whether a hotkey may fire, given which device triggered it.
    pub fn allows(&self, id: BindId, keyboard_trigger: bool) -> bool {
        if id == BindId::GameFocusToggle {
            return true;
        }
        if keyboard_trigger {
            !self.keyboard_hotkeys_blocked
        } else {
            !self.pad_hotkeys_blocked
        }
    }
}
