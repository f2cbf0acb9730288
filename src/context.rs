//! Shared engine state and the user-facing SDK.
//!
//! One [`EngineContext`] is created per application and shared (`Arc`)
//! between the physical thread, the render thread, executor tasks and user
//! callbacks. It owns the object pool, the request queues, the system
//! registry and the smaller per-run resources as named fields.
//!
//! Object lifecycle goes through requests: [`create`](EngineContext::create),
//! [`destroy`](EngineContext::destroy) and
//! [`set_active`](EngineContext::set_active) only enqueue, and the physical
//! loop applies them at fixed points of the next tick. That makes them safe
//! to call from any thread, including from inside step callbacks that are
//! iterating the pool.

use std::sync::Arc;

use log::debug;
use parking_lot::{RwLock, RwLockReadGuard};

use crate::error::{EngineError, EngineResult};
use crate::events::request::ResourceAccessRequest;
use crate::gameobject::GameObject;
use crate::resources::gameconfig::AppConfig;
use crate::resources::input::{InputBuffer, InputFeed};
use crate::resources::objectpool::ObjectPool;
use crate::resources::rendercmd::RenderCommandQueue;
use crate::resources::requests::RequestQueues;
use crate::resources::stats::EngineStats;
use crate::resources::worldtime::{TickClock, WorldTime};
use crate::sync::ShutdownSignal;
use crate::systems::System;
use crate::systems::registry::SystemRegistry;

pub struct EngineContext {
    pool: ObjectPool,
    queues: RequestQueues,
    systems: RwLock<SystemRegistry>,
    input: Arc<InputBuffer>,
    render_commands: RenderCommandQueue,
    clock: TickClock,
    stats: EngineStats,
    shutdown: Arc<ShutdownSignal>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("active", &self.pool.active_len())
            .field("inactive", &self.pool.inactive_len())
            .field("systems", &*self.systems.read())
            .field("killed", &self.shutdown.is_killed())
            .finish()
    }
}

impl EngineContext {
    pub fn new(config: &AppConfig) -> Arc<Self> {
        Arc::new(Self {
            pool: ObjectPool::new(),
            queues: RequestQueues::new(config.queue_capacity.max(1)),
            systems: RwLock::new(SystemRegistry::new()),
            input: Arc::new(InputBuffer::new()),
            render_commands: RenderCommandQueue::new(),
            clock: TickClock::new(config.physical_period()),
            stats: EngineStats::new(),
            shutdown: Arc::new(ShutdownSignal::new()),
        })
    }

    // ---- object lifecycle ----

    /// Build an object with `ctor` and request its registration as active.
    /// The object joins the pool on the next physical tick.
    pub fn create<F>(&self, ctor: F) -> EngineResult<Arc<GameObject>>
    where
        F: FnOnce(&EngineContext) -> GameObject,
    {
        self.instantiate(ctor(self), true)
    }

    /// Like [`create`](Self::create) but the object lands in the inactive
    /// pool: it is neither stepped nor rendered until activated.
    pub fn create_inactive<F>(&self, ctor: F) -> EngineResult<Arc<GameObject>>
    where
        F: FnOnce(&EngineContext) -> GameObject,
    {
        self.instantiate(ctor(self), false)
    }

    /// Request registration of an already built object.
    pub fn instantiate(&self, obj: impl Into<Arc<GameObject>>, active: bool) -> EngineResult<Arc<GameObject>> {
        let obj = obj.into();
        self.queues
            .register
            .submit(ResourceAccessRequest::new(Arc::clone(&obj), active))?;
        Ok(obj)
    }

    /// Request removal. On the tick that drains it the object leaves the
    /// pool and every system it subscribed to, then its `on_destroy` runs.
    /// This holds even if its register request is still queued: that request
    /// is refused later. Destroying a destroyed object is a no-op.
    pub fn destroy(&self, obj: &Arc<GameObject>) -> EngineResult<()> {
        if obj.is_destroyed() {
            return Ok(());
        }
        self.queues
            .unregister
            .submit(ResourceAccessRequest::new(Arc::clone(obj), obj.is_active()))
    }

    /// Request a move between the active and inactive pools.
    pub fn set_active(&self, obj: &Arc<GameObject>, active: bool) -> EngineResult<()> {
        if obj.is_destroyed() {
            return Err(EngineError::ObjectDestroyed(obj.id()));
        }
        self.queues
            .register
            .submit(ResourceAccessRequest::new(Arc::clone(obj), active))
    }

    // ---- systems ----

    /// Add `obj` to the working set of the system called `system`.
    /// Subscribing twice is a no-op; destroyed objects are rejected.
    pub fn subscribe(&self, obj: &Arc<GameObject>, system: &str) -> EngineResult<()> {
        let sys = self.system(system)?;
        if obj.is_destroyed() {
            return Err(EngineError::ObjectDestroyed(obj.id()));
        }
        if obj.subscriptions().iter().any(|s| s == system) {
            return Ok(());
        }
        sys.register(obj)?;
        obj.add_subscription(system);
        // the unregister drain marks before it collects subscriptions
        if obj.is_destroyed() {
            sys.unregister(obj);
            obj.remove_subscription(system);
            return Err(EngineError::ObjectDestroyed(obj.id()));
        }
        debug!("{} `{}` subscribed to {}", obj.id(), obj.name(), system);
        Ok(())
    }

    pub fn unsubscribe(&self, obj: &GameObject, system: &str) -> EngineResult<()> {
        let sys = self.system(system)?;
        sys.unregister(obj);
        obj.remove_subscription(system);
        Ok(())
    }

    /// Remove `obj` from every system it subscribed to.
    pub(crate) fn unsubscribe_all(&self, obj: &GameObject) {
        let names = obj.take_subscriptions();
        let systems = self.systems.read();
        for name in &names {
            if let Some(sys) = systems.get(name) {
                sys.unregister(obj);
            }
        }
    }

    pub fn system(&self, name: &str) -> EngineResult<Arc<dyn System>> {
        self.systems
            .read()
            .get(name)
            .ok_or_else(|| EngineError::UnknownSystem(name.to_string()))
    }

    pub fn add_system(&self, system: Arc<dyn System>) -> EngineResult<()> {
        self.systems.write().add(system)
    }

    pub fn systems(&self) -> RwLockReadGuard<'_, SystemRegistry> {
        self.systems.read()
    }

    // ---- run control ----

    /// Ask the application to shut down.
    pub fn exit(&self) -> EngineResult<()> {
        self.shutdown.kill()
    }

    pub fn shutdown(&self) -> &Arc<ShutdownSignal> {
        &self.shutdown
    }

    // ---- resources ----

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    /// Writer handle for the input-polling collaborator.
    pub fn input_feed(&self) -> InputFeed {
        InputFeed::new(Arc::clone(&self.input))
    }

    pub fn time(&self) -> WorldTime {
        self.clock.now()
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn render_commands(&self) -> &RenderCommandQueue {
        &self.render_commands
    }

    pub fn pool(&self) -> &ObjectPool {
        &self.pool
    }

    pub fn queues(&self) -> &RequestQueues {
        &self.queues
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::rigidbody::RigidBody;
    use crate::components::transform::Transform2D;
    use crate::error::QueueKind;
    use crate::math::Vec2;
    use crate::systems::physics::Physics2DSystem;

    fn make_ctx() -> Arc<EngineContext> {
        let ctx = EngineContext::new(&AppConfig::new());
        ctx.add_system(Arc::new(Physics2DSystem::new(0))).unwrap();
        ctx
    }

    fn make_body() -> Arc<GameObject> {
        Arc::new(
            GameObject::builder("body")
                .with_component(Transform2D::new(Vec2::ZERO))
                .with_component(RigidBody::new())
                .build(),
        )
    }

    #[test]
    fn subscribe_unknown_system_fails() {
        let ctx = make_ctx();
        let err = ctx.subscribe(&make_body(), "sys_Missing").unwrap_err();
        assert!(matches!(err, EngineError::UnknownSystem(name) if name == "sys_Missing"));
    }

    #[test]
    fn subscribe_is_recorded_on_the_object() {
        let ctx = make_ctx();
        let obj = make_body();
        ctx.subscribe(&obj, Physics2DSystem::NAME).unwrap();
        ctx.subscribe(&obj, Physics2DSystem::NAME).unwrap();
        assert_eq!(obj.subscriptions(), vec![Physics2DSystem::NAME.to_string()]);

        ctx.unsubscribe_all(&obj);
        assert!(obj.subscriptions().is_empty());
    }

    #[test]
    fn destroyed_object_cannot_subscribe_or_move() {
        let ctx = make_ctx();
        let obj = make_body();
        obj.mark_destroyed();
        assert!(matches!(
            ctx.subscribe(&obj, Physics2DSystem::NAME),
            Err(EngineError::ObjectDestroyed(id)) if id == obj.id()
        ));
        assert!(obj.subscriptions().is_empty());
        assert!(matches!(ctx.set_active(&obj, true), Err(EngineError::ObjectDestroyed(_))));
        ctx.destroy(&obj).unwrap();
        assert!(ctx.queues().unregister.is_empty());
        assert!(ctx.queues().register.is_empty());
    }

    #[test]
    fn failed_subscribe_leaves_no_trace() {
        let ctx = make_ctx();
        let obj = Arc::new(GameObject::builder("bare").build());
        assert!(ctx.subscribe(&obj, Physics2DSystem::NAME).is_err());
        assert!(obj.subscriptions().is_empty());
    }

    #[test]
    fn full_register_queue_is_reported() {
        let ctx = EngineContext::new(&AppConfig {
            queue_capacity: 1,
            ..AppConfig::new()
        });
        ctx.create(|_| GameObject::builder("a").build()).unwrap();
        let err = ctx.create(|_| GameObject::builder("b").build()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::QueueFull {
                queue: QueueKind::Register,
                capacity: 1
            }
        ));
    }

    #[test]
    fn exit_twice_is_an_error() {
        let ctx = make_ctx();
        ctx.exit().unwrap();
        assert!(matches!(ctx.exit(), Err(EngineError::AlreadyKilled)));
    }
}
