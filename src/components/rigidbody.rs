//! Kinematic body integrated by the physics system.
//!
//! The [`RigidBody`] component stores a list of decaying impulses and an
//! optional accelerating gravity pull. All speeds are in world units per
//! physical tick, since the physical loop runs at a fixed rate.
//!
//! # How It Works
//!
//! Each tick [`RigidBody::integrate`] sums every impulse along its
//! direction, shrinks each impulse by its deceleration (dropping the ones
//! that reach zero), adds gravity if enabled and accelerates it, clamps the
//! result to `max_speed` and returns the displacement for this tick.
//!
//! # Example
//! ```ignore
//! let rb = RigidBody::new().with_gravity(270.0, 0.02);
//! rb.add_impulse(Impulse::new(90.0, 3.0, 0.05)); // jump
//! ```

use parking_lot::Mutex;

use crate::components::Component;
use crate::math::Vec2;

/// A push in one direction that fades out over time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impulse {
    /// Direction in degrees; 90 is up the screen.
    pub direction: f32,
    /// Current speed in units per tick.
    pub speed: f32,
    /// Speed lost per tick.
    pub deceleration: f32,
}

impl Impulse {
    pub fn new(direction: f32, speed: f32, deceleration: f32) -> Self {
        Self {
            direction,
            speed,
            deceleration,
        }
    }
}

#[derive(Debug, Clone)]
struct BodyState {
    impulses: Vec<Impulse>,
    gravity_direction: f32,
    gravity_speed: f32,
    gravity_acceleration: f32,
    use_gravity: bool,
    max_speed: Option<f32>,
    frozen: bool,
    last_velocity: Vec2,
}

/// Impulse/gravity body. Thread-safe: integration runs on executor workers
/// while step callbacks may add impulses.
#[derive(Debug)]
pub struct RigidBody {
    state: Mutex<BodyState>,
}

impl Component for RigidBody {
    const NAME: &'static str = "RigidBody";
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::new()
    }
}

impl RigidBody {
    /// A body with no impulses and gravity disabled.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BodyState {
                impulses: Vec::new(),
                gravity_direction: 270.0,
                gravity_speed: 0.0,
                gravity_acceleration: 0.0,
                use_gravity: false,
                max_speed: None,
                frozen: false,
                last_velocity: Vec2::ZERO,
            }),
        }
    }

    /// Builder: enable gravity pulling towards `direction` degrees and
    /// growing by `acceleration` every tick.
    pub fn with_gravity(self, direction: f32, acceleration: f32) -> Self {
        {
            let mut state = self.state.lock();
            state.gravity_direction = direction;
            state.gravity_acceleration = acceleration;
            state.use_gravity = true;
        }
        self
    }

    /// Builder: clamp the per-tick displacement length.
    pub fn with_max_speed(self, max_speed: f32) -> Self {
        self.state.lock().max_speed = Some(max_speed);
        self
    }

    pub fn add_impulse(&self, impulse: Impulse) {
        self.state.lock().impulses.push(impulse);
    }

    pub fn impulse_count(&self) -> usize {
        self.state.lock().impulses.len()
    }

    /// Turn gravity on or off. Turning it off also resets the fall speed,
    /// which is what a grounded body wants.
    pub fn set_gravity_enabled(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.use_gravity = enabled;
        if !enabled {
            state.gravity_speed = 0.0;
        }
    }

    pub fn gravity_enabled(&self) -> bool {
        self.state.lock().use_gravity
    }

    /// When frozen, [`integrate`](Self::integrate) returns zero and keeps all
    /// impulses untouched.
    pub fn set_frozen(&self, frozen: bool) {
        self.state.lock().frozen = frozen;
    }

    /// Displacement produced by the most recent integration.
    pub fn velocity(&self) -> Vec2 {
        self.state.lock().last_velocity
    }

    /// Advance the body by one tick and return the displacement.
    pub fn integrate(&self) -> Vec2 {
        let mut state = self.state.lock();
        if state.frozen {
            state.last_velocity = Vec2::ZERO;
            return Vec2::ZERO;
        }

        let mut delta = Vec2::ZERO;
        state.impulses.retain_mut(|imp| {
            delta += Vec2::from_degrees(imp.direction) * imp.speed;
            imp.speed -= imp.deceleration;
            imp.speed > 0.0
        });

        if state.use_gravity {
            delta += Vec2::from_degrees(state.gravity_direction) * state.gravity_speed;
            state.gravity_speed += state.gravity_acceleration;
        }

        if let Some(max) = state.max_speed {
            let len = delta.length();
            if len > max && len > 0.0 {
                delta = delta * (max / len);
            }
        }

        state.last_velocity = delta;
        delta
    }
}
