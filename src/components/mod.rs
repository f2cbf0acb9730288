//! Components attached to game objects.
//!
//! A component is shared data + behavior owned by a
//! [`GameObject`](crate::gameobject::GameObject). Objects hold at most one
//! component per [`Component::NAME`]. Components are shared across threads
//! (physical loop, render loop, executor workers), so each one guards its
//! own mutable state.
//!
//! Submodules overview:
//! - [`rigidbody`] – impulses and gravity integrated by the physics system
//! - [`sprite`] – render depth and per-tick frame stepping
//! - [`transform`] – current/previous position pair used for interpolation

pub mod rigidbody;
pub mod sprite;
pub mod transform;

/// Capability attached to a game object, looked up by [`Component::NAME`].
pub trait Component: Send + Sync + 'static {
    /// Unique name of the capability.
    const NAME: &'static str;
}
