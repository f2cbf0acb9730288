//! Rigid body integration.
//!
//! Each subscribed object contributes a [`Transform2D`] and a [`RigidBody`].
//! `execute` submits one task per object; the task integrates the body's
//! impulses and gravity and translates the transform by the result. Tasks
//! for different objects run in parallel and touch disjoint components.
//!
//! With debug drawing enabled, every task also queues a render command that
//! hands the object's displacement segment to the configured callback.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::components::Component;
use crate::components::rigidbody::RigidBody;
use crate::components::transform::Transform2D;
use crate::error::{EngineError, EngineResult, TaskError};
use crate::executor::TickScope;
use crate::gameobject::{GameObject, ObjectId};
use crate::math::Vec2;
use crate::systems::render::FrameInfo;
use crate::systems::{System, SystemBase};

/// Receives `(from, to)` for each integrated object, on the render thread.
pub type DebugDrawFn = dyn Fn(Vec2, Vec2, &FrameInfo) + Send + Sync;

#[derive(Debug, Clone)]
struct PhysicsBundle {
    transform: Arc<Transform2D>,
    body: Arc<RigidBody>,
}

pub struct Physics2DSystem {
    base: SystemBase,
    bodies: RwLock<BTreeMap<ObjectId, PhysicsBundle>>,
    debug_draw: Option<Arc<DebugDrawFn>>,
}

impl std::fmt::Debug for Physics2DSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Physics2DSystem")
            .field("priority", &self.base.priority())
            .field("bodies", &self.len())
            .field("debug_draw", &self.debug_draw.is_some())
            .finish()
    }
}

impl Physics2DSystem {
    pub const NAME: &'static str = "sys_Physics2D";

    pub fn new(priority: i32) -> Self {
        Self {
            base: SystemBase::new(priority),
            bodies: RwLock::new(BTreeMap::new()),
            debug_draw: None,
        }
    }

    pub fn with_debug_draw<F>(mut self, draw: F) -> Self
    where
        F: Fn(Vec2, Vec2, &FrameInfo) + Send + Sync + 'static,
    {
        self.debug_draw = Some(Arc::new(draw));
        self
    }

    /// Subscribed objects.
    pub fn len(&self) -> usize {
        self.bodies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.read().is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.bodies.read().contains_key(&id)
    }
}

impl System for Physics2DSystem {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn execute(&self, scope: &TickScope<'_>) -> EngineResult<()> {
        // copy out so subscribe/unsubscribe from tasks cannot deadlock
        let bundles: Vec<PhysicsBundle> = self.bodies.read().values().cloned().collect();
        for bundle in bundles {
            let debug = self
                .debug_draw
                .as_ref()
                .map(|draw| (Arc::clone(draw), scope.context().render_commands().sender()));
            let _ = scope.submit(move || {
                let delta = bundle.body.integrate();
                let from = bundle.transform.position();
                bundle.transform.translate(delta);
                if let Some((draw, tx)) = debug {
                    let to = from + delta * 10.0;
                    tx.send(Box::new(move |frame: &FrameInfo| draw(from, to, frame)))
                        .map_err(|_| TaskError::failed("render command queue closed"))?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn register(&self, obj: &Arc<GameObject>) -> EngineResult<()> {
        let missing = |component| EngineError::MissingComponent {
            object: obj.name().to_string(),
            component,
        };
        let transform = obj
            .component::<Transform2D>()
            .ok_or_else(|| missing(Transform2D::NAME))?;
        let body = obj
            .component::<RigidBody>()
            .ok_or_else(|| missing(RigidBody::NAME))?;
        self.bodies
            .write()
            .insert(obj.id(), PhysicsBundle { transform, body });
        debug!("{} subscribed {} `{}`", Self::NAME, obj.id(), obj.name());
        Ok(())
    }

    fn unregister(&self, obj: &GameObject) {
        if self.bodies.write().remove(&obj.id()).is_some() {
            debug!("{} dropped {} `{}`", Self::NAME, obj.id(), obj.name());
        }
    }
}
