//! Keyboard state, the per-frame event queue, and key-wait subscriptions.
//!
//! All keyboard traffic funnels through [`KeyboardState::event`]: level
//! state updates first, then a pending subscription gets a chance to eat
//! the event (bind-capture and line-edit UIs), and only unconsumed events
//! reach the per-frame queue for downstream consumers.

use axon_types::keys::{Key, KeyEvent};

/// Callback of a key-wait subscription. Return `true` to stay subscribed,
/// `false` once the wait is satisfied.
pub type KeyCallback = Box<dyn FnMut(KeyEvent) -> bool>;

/// A key-wait slot is either empty or holds exactly one waiting callback.
pub enum KeySubscription {
    Idle,
    Pending(KeyCallback),
}

/// Level state plus event plumbing for the keyboard.
pub struct KeyboardState {
    down: Vec<Key>,
    queue: Vec<KeyEvent>,
    subscription: KeySubscription,
}

impl Default for KeyboardState {
    fn default() -> KeyboardState {
        KeyboardState::new()
    }
}

impl KeyboardState {
    pub fn new() -> KeyboardState {
        KeyboardState {
            down: Vec::new(),
            queue: Vec::new(),
            subscription: KeySubscription::Idle,
        }
    }

    /// Feed one keyboard transition through the path.
    ///
    /// Returns `true` when a subscription consumed the event, in which
    /// case it is withheld from the queue.
    pub fn event(&mut self, event: KeyEvent) -> bool {
        if event.key != Key::None {
            if event.down {
                if !self.down.contains(&event.key) {
                    self.down.push(event.key);
                }
            } else {
                self.down.retain(|k| *k != event.key);
            }
        }

        if let KeySubscription::Pending(callback) = &mut self.subscription {
            if !callback(event) {
                self.subscription = KeySubscription::Idle;
            }
            return true;
        }

        self.queue.push(event);
        false
    }

    /// Level state of one key.
    pub fn pressed(&self, key: Key) -> bool {
        key != Key::None && self.down.contains(&key)
    }

    /// Take the events that reached the queue since the last drain.
    pub fn drain_events(&mut self) -> Vec<KeyEvent> {
        std::mem::take(&mut self.queue)
    }

    /// Park a callback to receive the next events. An already-pending
    /// subscription is dropped in favor of the new one.
    pub fn subscribe(&mut self, callback: KeyCallback) {
        if matches!(self.subscription, KeySubscription::Pending(_)) {
            log::warn!("replacing an active key-wait subscription");
        }
        self.subscription = KeySubscription::Pending(callback);
    }

    /// Drop any pending subscription.
    pub fn cancel_subscription(&mut self) {
        self.subscription = KeySubscription::Idle;
    }

    /// Whether a subscription is waiting.
    pub fn subscribed(&self) -> bool {
        matches!(self.subscription, KeySubscription::Pending(_))
    }

    /// Force-release every key, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.down.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn press(key: Key) -> KeyEvent {
        KeyEvent { down: true, key, character: 0, mods: axon_types::keys::KeyMods::NONE }
    }

    fn release(key: Key) -> KeyEvent {
        KeyEvent { down: false, key, character: 0, mods: axon_types::keys::KeyMods::NONE }
    }

    #[test]
    fn level_state_tracks_transitions() {
        let mut kb = KeyboardState::new();
        assert!(!kb.pressed(Key::A));
        kb.event(press(Key::A));
        kb.event(press(Key::A));
        assert!(kb.pressed(Key::A));
        kb.event(release(Key::A));
        assert!(!kb.pressed(Key::A));
    }

    #[test]
    fn unconsumed_events_reach_the_queue() {
        let mut kb = KeyboardState::new();
        kb.event(press(Key::Q));
        kb.event(release(Key::Q));
        let events = kb.drain_events();
        assert_eq!(events.len(), 2);
        assert!(events[0].down);
        assert!(!events[1].down);
        assert!(kb.drain_events().is_empty());
    }

    #[test]
    fn subscription_eats_events_until_done() {
        let mut kb = KeyboardState::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        kb.subscribe(Box::new(move |event| {
            sink.borrow_mut().push(event.key);
            // wait for the first press
            !event.down
        }));
        assert!(kb.subscribed());

        assert!(kb.event(release(Key::A)));
        assert!(kb.subscribed());
        assert!(kb.event(press(Key::B)));
        assert!(!kb.subscribed());

        // the wait is over, traffic flows to the queue again
        assert!(!kb.event(press(Key::C)));
        assert_eq!(*seen.borrow(), vec![Key::A, Key::B]);
        assert_eq!(kb.drain_events().len(), 1);
    }

    #[test]
    fn consumed_events_still_update_level_state() {
        let mut kb = KeyboardState::new();
        kb.subscribe(Box::new(|_| true));
        kb.event(press(Key::X));
        assert!(kb.pressed(Key::X));
        assert!(kb.drain_events().is_empty());
        kb.cancel_subscription();
        assert!(!kb.subscribed());
    }

    #[test]
    fn release_all_clears_level_state() {
        let mut kb = KeyboardState::new();
        kb.event(press(Key::A));
        kb.event(press(Key::B));
        kb.release_all();
        assert!(!kb.pressed(Key::A));
        assert!(!kb.pressed(Key::B));
    }
}
