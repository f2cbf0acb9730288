//! Engine systems.
//!
//! A system owns a working set of subscribed objects and is executed once
//! per physical tick, in ascending priority order. Objects subscribe by
//! system name through
//! [`EngineContext::subscribe`](crate::context::EngineContext::subscribe);
//! the pool never registers objects with systems on its own.
//!
//! Submodules overview
//! - [`physics`] – integrate rigid bodies into transforms on the executor
//! - [`registry`] – priority-ordered, name-indexed system list
//! - [`render`] – depth-sorted render pass over the active pool
//! - [`tick`] – the fixed six-step physical tick

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::EngineResult;
use crate::executor::TickScope;
use crate::gameobject::GameObject;

pub mod physics;
pub mod registry;
pub mod render;
pub mod tick;

/// Priority and enabled flag shared by every system.
///
/// Systems start disabled; the physical loop enables all of them when it
/// starts. The flag is read once per tick, when the runnable list is built.
#[derive(Debug)]
pub struct SystemBase {
    priority: i32,
    enabled: AtomicBool,
}

impl SystemBase {
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            enabled: AtomicBool::new(false),
        }
    }

    /// Lower runs first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }
}

/// A unit of per-tick work over a working set of objects.
pub trait System: Send + Sync {
    /// Unique name objects subscribe with.
    fn name(&self) -> &str;

    fn base(&self) -> &SystemBase;

    /// Run once per tick. Returning means the work was submitted, not that
    /// it finished; tasks submitted through `scope` are awaited before
    /// positions are memorized.
    fn execute(&self, scope: &TickScope<'_>) -> EngineResult<()>;

    /// Add `obj` to the working set.
    fn register(&self, obj: &Arc<GameObject>) -> EngineResult<()>;

    /// Drop `obj` from the working set. Unknown objects are ignored.
    fn unregister(&self, obj: &GameObject);
}
