//! Raw key events.
//!
//! The input-polling collaborator (window backend, replay script, test)
//! turns hardware state into [`InputEvent`]s and feeds them to the
//! [`InputBuffer`](crate::resources::input::InputBuffer) through an
//! [`InputFeed`](crate::resources::input::InputFeed). Step callbacks only see
//! the resulting pressed/held/released sets.

/// Keys the engine knows by name. Anything else travels as [`Key::Code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Up,
    Down,
    Left,
    Right,
    Space,
    Enter,
    Escape,
    /// Backend-specific key code.
    Code(u32),
}

/// A key went down (`pressed = true`) or up (`pressed = false`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub key: Key,
    pub pressed: bool,
}

impl InputEvent {
    pub fn press(key: Key) -> Self {
        Self { key, pressed: true }
    }

    pub fn release(key: Key) -> Self {
        Self {
            key,
            pressed: false,
        }
    }
}
