//! Command interface feed.
//!
//! External command senders (stdin, network) can press binds for a single
//! frame. Presses are port-agnostic and merge into every port's digital
//! reads, so a sender does not need to know the port layout.

use axon_types::binds::{BindId, BindMask};

/// One frame's worth of command-injected presses.
#[derive(Debug, Default)]
pub struct CommandFeed {
    pressed: BindMask,
}

impl CommandFeed {
    pub fn new() -> CommandFeed {
        CommandFeed::default()
    }

    /// Forget everything. Called at the top of every poll.
    pub fn clear(&mut self) {
        self.pressed = BindMask::EMPTY;
    }

    /// Press a bind for the current frame.
    pub fn press(&mut self, id: BindId) {
        self.pressed.set(id);
    }

    pub fn pressed(&self, id: BindId) -> bool {
        self.pressed.contains(id)
    }

    pub fn mask(&self) -> BindMask {
        self.pressed
    }
}
