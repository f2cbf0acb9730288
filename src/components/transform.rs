//! Double-buffered position component.
//!
//! [`Transform2D`] keeps the current position together with the position as
//! of the end of the last completed physical tick. The physics system and
//! user step callbacks write the current position (possibly from executor
//! workers), the render thread reads both to interpolate, and the physical
//! tick's memorize phase is the only writer of the previous slot.
//!
//! Both slots live behind one lock, so a reader always sees a pair taken at
//! the same instant and never a half-written position.

use parking_lot::Mutex;

use crate::components::Component;
use crate::math::Vec2;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct TransformState {
    current: Vec2,
    previous: Vec2,
}

/// Current and previous position of a movable object.
#[derive(Debug, Default)]
pub struct Transform2D {
    state: Mutex<TransformState>,
}

impl Component for Transform2D {
    const NAME: &'static str = "Transform2D";
}

impl Transform2D {
    /// Create a transform at `pos`; the previous slot starts equal to it.
    pub fn new(pos: Vec2) -> Self {
        Self {
            state: Mutex::new(TransformState {
                current: pos,
                previous: pos,
            }),
        }
    }

    pub fn position(&self) -> Vec2 {
        self.state.lock().current
    }

    pub fn set_position(&self, pos: Vec2) {
        self.state.lock().current = pos;
    }

    /// Move the current position by `delta`.
    pub fn translate(&self, delta: Vec2) {
        self.state.lock().current += delta;
    }

    /// Position as of the end of the last completed physical tick.
    pub fn previous(&self) -> Vec2 {
        self.state.lock().previous
    }

    /// `(previous, current)` read under a single lock.
    pub fn snapshot(&self) -> (Vec2, Vec2) {
        let state = self.state.lock();
        (state.previous, state.current)
    }

    /// Position blended between the previous and current tick.
    pub fn interpolated(&self, alpha: f32) -> Vec2 {
        let (prev, cur) = self.snapshot();
        prev.lerp(cur, alpha.clamp(0.0, 1.0))
    }

    /// Copy current into previous. Called once per object at the end of each
    /// physical tick, from the physical thread only.
    pub(crate) fn memorize(&self) {
        let mut state = self.state.lock();
        state.previous = state.current;
    }
}
