//! Turbo fire modulation.
//!
//! One free-running frame counter is shared by every port so pulse trains
//! stay in phase across players. Classic mode latches any eligible button
//! held together with the turbo-enable control; the single-button modes
//! drive one armed target bind from the turbo-enable control alone.

use axon_types::binds::{BindId, BindMask};
use axon_types::settings::{TurboMode, TurboSettings};
use axon_types::MAX_PORTS;

#[derive(Debug, Default)]
struct PortTurbo {
    /// Binds currently under turbo modulation.
    enable: BindMask,
    /// Turbo-enable control held during the current frame.
    frame_enable: bool,
    /// Edge detector so a held turbo-enable toggles exactly once.
    latched: bool,
    /// Target bind of the single-button modes.
    armed: Option<BindId>,
}

/// Shared turbo state for all ports.
#[derive(Debug)]
pub struct TurboBank {
    counter: u64,
    ports: Vec<PortTurbo>,
}

impl TurboBank {
    /// A bank with every port idle and `default_bind` armed where eligible.
    pub fn new(default_bind: Option<BindId>) -> TurboBank {
        let armed = default_bind.filter(|id| id.is_turbo_eligible());
        TurboBank {
            counter: 0,
            ports: (0..MAX_PORTS)
                .map(|_| PortTurbo { armed, ..PortTurbo::default() })
                .collect(),
        }
    }

    /// Step the shared counter. Called once per frame, after the frame's
    /// queries have been answered.
    pub fn advance(&mut self) {
        self.counter = self.counter.wrapping_add(1);
    }

    /// Record whether the turbo-enable control is held on a port this
    /// frame, driving the single-button arm/disarm logic.
    pub fn set_frame_enable(&mut self, port: usize, held: bool, settings: &TurboSettings) {
        let Some(state) = self.ports.get_mut(port) else {
            return;
        };
        state.frame_enable = held;
        match settings.mode {
            TurboMode::Classic => {}
            TurboMode::SingleButton => {
                if held && !state.latched {
                    state.latched = true;
                    if let Some(id) = state.armed {
                        if state.enable.contains(id) {
                            state.enable.clear(id);
                        } else {
                            state.enable.set(id);
                        }
                    }
                } else if !held {
                    state.latched = false;
                }
            }
            TurboMode::SingleButtonHold => {
                if let Some(id) = state.armed {
                    if held {
                        state.enable.set(id);
                    } else {
                        state.enable.clear(id);
                    }
                }
            }
        }
    }

    /// Run one digital read through the modulator.
    ///
    /// Classic mode latches `id` while it is held together with the
    /// turbo-enable control and gates the result by the duty cycle;
    /// single-button modes pulse the armed bind while engaged, whether or
    /// not it is physically pressed. Ineligible binds pass through.
    pub fn apply(&mut self, port: usize, id: BindId, pressed: bool, settings: &TurboSettings) -> bool {
        if !id.is_turbo_eligible() {
            return pressed;
        }
        let counter = self.counter;
        let Some(state) = self.ports.get_mut(port) else {
            return pressed;
        };
        let period = u64::from(settings.period.max(1));
        let pulse = counter % period < u64::from(settings.duty_cycle);
        match settings.mode {
            TurboMode::Classic => {
                if pressed && state.frame_enable {
                    state.enable.set(id);
                } else if !pressed {
                    state.enable.clear(id);
                }
                if state.enable.contains(id) {
                    pressed && pulse
                } else {
                    pressed
                }
            }
            TurboMode::SingleButton | TurboMode::SingleButtonHold => {
                if state.armed == Some(id) && state.enable.contains(id) {
                    pulse
                } else {
                    pressed
                }
            }
        }
    }

    /// The single-button target on a port.
    pub fn armed(&self, port: usize) -> Option<BindId> {
        self.ports.get(port).and_then(|s| s.armed)
    }

    /// Re-target the single-button modes. Ineligible binds are refused.
    pub fn set_armed(&mut self, port: usize, id: Option<BindId>) {
        let Some(state) = self.ports.get_mut(port) else {
            return;
        };
        match id {
            Some(id) if !id.is_turbo_eligible() => {
                log::warn!("bind {id:?} cannot be a turbo target, keeping {:?}", state.armed);
            }
            other => {
                state.enable = BindMask::EMPTY;
                state.armed = other;
            }
        }
    }

    /// Advance the armed target to the next turbo-eligible bind.
    pub fn cycle_armed(&mut self, port: usize) {
        let Some(state) = self.ports.get_mut(port) else {
            return;
        };
        let start = state.armed.map(|id| id.index()).unwrap_or(BindId::PAD_BUTTONS - 1);
        let next = (1..=BindId::PAD_BUTTONS)
            .map(|step| (start + step) % BindId::PAD_BUTTONS)
            .filter_map(BindId::from_index)
            .find(|id| id.is_turbo_eligible());
        state.enable = BindMask::EMPTY;
        state.armed = next;
    }
}
