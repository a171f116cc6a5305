//! Remote pad feed.
//!
//! A network transport (out of scope here) decodes per-control messages
//! and deposits them for the frame; the aggregator merges them like any
//! other contributor. State lives for exactly one poll.

use axon_types::binds::{BindId, BindMask};
use axon_types::MAX_PORTS;

#[derive(Debug, Clone, Copy, Default)]
struct RemotePort {
    buttons: BindMask,
    /// Left X, left Y, right X, right Y.
    analog: [i16; 4],
}

/// Per-port state injected by remote players.
#[derive(Debug, Default)]
pub struct RemoteFeed {
    ports: [RemotePort; MAX_PORTS],
}

impl RemoteFeed {
    pub fn new() -> RemoteFeed {
        RemoteFeed::default()
    }

    /// Forget everything. Called at the top of every poll.
    pub fn clear(&mut self) {
        self.ports = [RemotePort::default(); MAX_PORTS];
    }

    pub fn set_button(&mut self, port: usize, id: BindId) {
        if let Some(state) = self.ports.get_mut(port) {
            state.buttons.set(id);
        }
    }

    pub fn button_pressed(&self, port: usize, id: BindId) -> bool {
        self.ports
            .get(port)
            .map(|state| state.buttons.contains(id))
            .unwrap_or(false)
    }

    /// Set one analog axis: `stick` 0 = left, 1 = right; `axis` 0 = X,
    /// 1 = Y. Out-of-range addresses are dropped.
    pub fn set_analog(&mut self, port: usize, stick: u32, axis: u32, value: i16) {
        if stick > 1 || axis > 1 {
            return;
        }
        if let Some(state) = self.ports.get_mut(port) {
            state.analog[(stick * 2 + axis) as usize] = value;
        }
    }

    pub fn analog(&self, port: usize, stick: u32, axis: u32) -> i16 {
        if stick > 1 || axis > 1 {
            return 0;
        }
        self.ports
            .get(port)
            .map(|state| state.analog[(stick * 2 + axis) as usize])
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_lives_for_one_poll() {
        let mut feed = RemoteFeed::new();
        feed.set_button(2, BindId::Start);
        feed.set_analog(2, 1, 0, -5000);
        assert!(feed.button_pressed(2, BindId::Start));
        assert_eq!(feed.analog(2, 1, 0), -5000);

        feed.clear();
        assert!(!feed.button_pressed(2, BindId::Start));
        assert_eq!(feed.analog(2, 1, 0), 0);
    }

    #[test]
    fn out_of_range_addresses_are_neutral() {
        let mut feed = RemoteFeed::new();
        feed.set_button(MAX_PORTS, BindId::A);
        feed.set_analog(0, 2, 0, 100);
        assert!(!feed.button_pressed(MAX_PORTS, BindId::A));
        assert_eq!(feed.analog(0, 2, 0), 0);
        assert_eq!(feed.analog(0, 0, 5), 0);
    }
}
