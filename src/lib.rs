//! Galaxy Engine library.
//!
//! Scheduling and object-lifecycle core of a 2D engine: a fixed-rate
//! physical loop on its own thread, a render loop on the calling thread, a
//! worker-pool executor for per-object system work, and a label-partitioned
//! object pool mutated only through deferred request queues.
//!
//! Start from [`app::Application::builder`]; user code talks to the engine
//! through [`context::EngineContext`].

pub mod app;
pub mod components;
pub mod context;
pub mod error;
pub mod events;
pub mod executor;
pub mod frontend;
pub mod game;
pub mod gameobject;
pub mod logging;
pub mod math;
pub mod resources;
pub mod sync;
pub mod systems;
