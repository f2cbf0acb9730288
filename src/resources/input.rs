//! Per-tick keyboard edge buffer.
//!
//! [`InputBuffer`] keeps three key sets visible to step callbacks:
//! - `pressed` – keys that went down before this tick started
//! - `held` – keys currently down
//! - `released` – keys that went up before this tick started
//!
//! The input-polling collaborator writes through an [`InputFeed`] at any
//! time, usually from the render thread. New edges wait in a pending set
//! until the physical loop latches them at the start of a tick, and the
//! tick's flush clears them once every step callback has seen them. An edge
//! that arrives mid-tick is therefore seen on the next tick, never lost.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::events::input::{InputEvent, Key};

#[derive(Debug, Default)]
struct KeySets {
    pressed: FxHashSet<Key>,
    held: FxHashSet<Key>,
    released: FxHashSet<Key>,
    pending_pressed: FxHashSet<Key>,
    pending_released: FxHashSet<Key>,
}

/// Shared key state, read by step callbacks.
#[derive(Debug, Default)]
pub struct InputBuffer {
    sets: Mutex<KeySets>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key went down since the last tick.
    pub fn is_pressed(&self, key: Key) -> bool {
        self.sets.lock().pressed.contains(&key)
    }

    /// Key is currently down.
    pub fn is_held(&self, key: Key) -> bool {
        self.sets.lock().held.contains(&key)
    }

    /// Key went up since the last tick.
    pub fn is_released(&self, key: Key) -> bool {
        self.sets.lock().released.contains(&key)
    }

    /// Both visible edge sets are empty.
    pub fn edges_empty(&self) -> bool {
        let sets = self.sets.lock();
        sets.pressed.is_empty() && sets.released.is_empty()
    }

    fn apply(&self, event: InputEvent) {
        let mut sets = self.sets.lock();
        if event.pressed {
            // auto-repeat from the backend is not a new press
            if sets.held.insert(event.key) {
                sets.pending_pressed.insert(event.key);
            }
        } else if sets.held.remove(&event.key) {
            sets.pending_released.insert(event.key);
        }
    }

    /// Make pending edges visible. Called once at the start of a tick.
    pub(crate) fn latch(&self) {
        let mut guard = self.sets.lock();
        let sets = &mut *guard;
        sets.pressed.extend(sets.pending_pressed.drain());
        sets.released.extend(sets.pending_released.drain());
    }

    /// Clear the visible pressed and released sets. Held keys stay held.
    pub(crate) fn flush(&self) {
        let mut sets = self.sets.lock();
        sets.pressed.clear();
        sets.released.clear();
    }
}

/// Write handle given to the input-polling collaborator.
#[derive(Debug, Clone)]
pub struct InputFeed {
    buffer: Arc<InputBuffer>,
}

impl InputFeed {
    pub(crate) fn new(buffer: Arc<InputBuffer>) -> Self {
        Self { buffer }
    }

    pub fn push(&self, event: InputEvent) {
        self.buffer.apply(event);
    }

    pub fn press(&self, key: Key) {
        self.push(InputEvent::press(key));
    }

    pub fn release(&self, key: Key) {
        self.push(InputEvent::release(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_feed() -> (Arc<InputBuffer>, InputFeed) {
        let buffer = Arc::new(InputBuffer::new());
        let feed = InputFeed::new(Arc::clone(&buffer));
        (buffer, feed)
    }

    #[test]
    fn press_is_visible_after_latch() {
        let (buffer, feed) = make_feed();
        feed.press(Key::W);
        assert!(buffer.is_held(Key::W));
        assert!(!buffer.is_pressed(Key::W));

        buffer.latch();
        assert!(buffer.is_pressed(Key::W));
        assert!(!buffer.is_released(Key::W));
    }

    #[test]
    fn flush_clears_edges_but_keeps_held() {
        let (buffer, feed) = make_feed();
        feed.press(Key::A);
        feed.press(Key::Space);
        feed.release(Key::Space);
        buffer.latch();
        assert!(buffer.is_pressed(Key::Space));
        assert!(buffer.is_released(Key::Space));

        buffer.flush();
        assert!(buffer.edges_empty());
        assert!(buffer.is_held(Key::A));
        assert!(!buffer.is_held(Key::Space));
    }

    #[test]
    fn edge_arriving_before_flush_survives_it() {
        let (buffer, feed) = make_feed();
        buffer.latch();
        feed.press(Key::Enter);
        buffer.flush();
        assert!(!buffer.is_pressed(Key::Enter));

        buffer.latch();
        assert!(buffer.is_pressed(Key::Enter));
    }

    #[test]
    fn repeated_press_is_not_a_new_edge() {
        let (buffer, feed) = make_feed();
        feed.press(Key::D);
        buffer.latch();
        buffer.flush();
        feed.press(Key::D);
        buffer.latch();
        assert!(!buffer.is_pressed(Key::D));
        assert!(buffer.is_held(Key::D));
    }

    #[test]
    fn release_of_unheld_key_is_ignored() {
        let (buffer, feed) = make_feed();
        feed.release(Key::Code(42));
        buffer.latch();
        assert!(buffer.edges_empty());
    }
}
