//! The physical tick.
//!
//! One call runs, in this order, on the physical thread:
//!
//! 1. drain register requests into the pool, latch pending input edges
//! 2. execute every enabled system in priority order
//! 3. run each active object's step callback and advance its sprite frame
//! 4. flush the input edge buffer
//! 5. drain unregister requests: mark the object destroyed, remove it from
//!    the pool and every system, run `on_destroy`. An object destroyed
//!    before its register request was drained gets the same treatment and
//!    is refused when that request comes up.
//! 6. wait for the tick's system tasks, then memorize every active
//!    transform
//!
//! Step 3 and step 6 iterate a snapshot of the active pool; no callback
//! runs while a pool lock is held.

use std::sync::Arc;

use log::{trace, warn};

use crate::context::EngineContext;
use crate::executor::{Executor, TickScope};
use crate::resources::objectpool::Registration;
use crate::sync::WaitGroup;

/// What one tick did.
///
/// Counters report pool changes, not drained requests, so the pool holds
/// exactly `registered - unregistered` more objects after the tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Clock value after this tick.
    pub tick: u64,
    /// Objects that entered the pool.
    pub registered: usize,
    /// Objects that switched between active and inactive.
    pub moved: usize,
    /// Objects removed from the pool.
    pub unregistered: usize,
    /// `on_destroy` runs, including objects that never reached the pool.
    pub destroyed: usize,
    pub systems_run: usize,
    /// Objects whose step callback ran.
    pub stepped: usize,
    /// Transforms memorized.
    pub memorized: usize,
}

pub fn physical_tick(ctx: &Arc<EngineContext>, executor: &Executor) -> TickReport {
    let pool = ctx.pool();

    // 1. register
    let (mut registered, mut moved) = (0, 0);
    ctx.queues().register.drain(|req| match pool.register(req.object, req.active) {
        Registration::Added => registered += 1,
        Registration::Moved => moved += 1,
        Registration::Unchanged | Registration::Refused => {}
    });
    ctx.input().latch();

    // 2. systems
    let group = Arc::new(WaitGroup::new());
    let scope = TickScope::new(executor, &group, ctx);
    let runnable = ctx.systems().runnable();
    for system in &runnable {
        if let Err(e) = system.execute(&scope) {
            warn!("system `{}` failed to submit work: {}", system.name(), e);
        }
    }

    // 3. steps
    let active = pool.active_snapshot();
    for obj in &active {
        obj.step(ctx);
    }

    // 4. input
    ctx.input().flush();

    // 5. unregister
    let (mut unregistered, mut destroyed) = (0, 0);
    ctx.queues().unregister.drain(|req| {
        let obj = req.object;
        if !obj.mark_destroyed() {
            return;
        }
        if pool.unregister(&obj, obj.is_active()).is_some() {
            unregistered += 1;
        }
        ctx.unsubscribe_all(&obj);
        obj.destroy(ctx);
        destroyed += 1;
    });

    // 6. memorize
    group.wait();
    let mut memorized = 0;
    for obj in pool.active_snapshot() {
        if let Some(t) = obj.transform() {
            t.memorize();
            memorized += 1;
        }
    }

    let tick = ctx.clock().advance();
    ctx.stats().record_tick(registered, unregistered);
    trace!(
        "tick {}: +{} -{} systems={} active={}",
        tick,
        registered,
        unregistered,
        runnable.len(),
        pool.active_len()
    );

    TickReport {
        tick,
        registered,
        moved,
        unregistered,
        destroyed,
        systems_run: runnable.len(),
        stepped: active.len(),
        memorized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::rigidbody::RigidBody;
    use crate::components::transform::Transform2D;
    use crate::events::input::Key;
    use crate::error::EngineError;
    use crate::systems::System;
    use crate::systems::physics::Physics2DSystem;
    use crate::executor::ExecutionMode;
    use crate::gameobject::GameObject;
    use crate::math::Vec2;
    use crate::resources::gameconfig::AppConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn make_env() -> (Arc<EngineContext>, Executor) {
        let ctx = EngineContext::new(&AppConfig::new());
        let ex = Executor::new(2, ExecutionMode::Threaded);
        ex.run().unwrap();
        (ctx, ex)
    }

    #[test]
    fn registration_takes_effect_on_the_next_tick() {
        let (ctx, ex) = make_env();
        let obj = ctx.create(|_| GameObject::builder("a").build()).unwrap();
        assert_eq!(ctx.pool().active_len(), 0);

        let report = physical_tick(&ctx, &ex);
        assert_eq!(report.registered, 1);
        assert_eq!(report.stepped, 1);
        assert!(obj.is_active());
    }

    #[test]
    fn destroy_runs_on_destroy_once_and_empties_pool() {
        let (ctx, ex) = make_env();
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);
        let obj = ctx
            .create(move |_| {
                GameObject::builder("a")
                    .on_destroy(move |_, _| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .build()
            })
            .unwrap();
        physical_tick(&ctx, &ex);

        ctx.destroy(&obj).unwrap();
        ctx.destroy(&obj).unwrap();
        let report = physical_tick(&ctx, &ex);
        assert_eq!(report.unregistered, 1);
        assert_eq!(report.destroyed, 1);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.pool().membership(&obj), None);
        assert!(obj.is_destroyed());
    }

    #[test]
    fn object_created_and_destroyed_in_one_step_never_joins_the_pool() {
        let (ctx, ex) = make_env();
        let physics = Arc::new(Physics2DSystem::new(0));
        ctx.add_system(Arc::clone(&physics) as Arc<dyn System>).unwrap();
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);
        let child_slot: Arc<parking_lot::Mutex<Option<Arc<GameObject>>>> = Default::default();
        let slot = Arc::clone(&child_slot);
        ctx.create(move |_| {
            GameObject::builder("spawner")
                .on_step(move |_, ctx| {
                    if ctx.time().tick != 1 {
                        return;
                    }
                    let counter = Arc::clone(&counter);
                    let child = ctx
                        .create(|_| {
                            GameObject::builder("child")
                                .with_component(Transform2D::new(Vec2::ZERO))
                                .with_component(RigidBody::new())
                                .on_destroy(move |_, _| {
                                    counter.fetch_add(1, Ordering::SeqCst);
                                })
                                .build()
                        })
                        .unwrap();
                    ctx.subscribe(&child, Physics2DSystem::NAME).unwrap();
                    ctx.destroy(&child).unwrap();
                    *slot.lock() = Some(child);
                })
                .build()
        })
        .unwrap();
        physical_tick(&ctx, &ex);
        assert_eq!(ctx.pool().active_len(), 1);

        let report = physical_tick(&ctx, &ex);
        assert_eq!((report.registered, report.unregistered, report.destroyed), (0, 0, 1));
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        let child = child_slot.lock().clone().unwrap();
        assert!(child.subscriptions().is_empty());
        assert!(!physics.contains(child.id()));
        assert!(matches!(
            ctx.subscribe(&child, Physics2DSystem::NAME),
            Err(EngineError::ObjectDestroyed(_))
        ));

        for _ in 0..2 {
            let before = ctx.pool().active_len();
            let report = physical_tick(&ctx, &ex);
            assert_eq!(report.registered, 0);
            assert_eq!(ctx.pool().active_len(), before);
        }
        assert_eq!(ctx.pool().active_len(), 1);
        assert!(!ctx.pool().contains(&child));
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn side_moves_are_not_counted_as_registrations() {
        let (ctx, ex) = make_env();
        let obj = ctx.create(|_| GameObject::builder("a").build()).unwrap();
        physical_tick(&ctx, &ex);

        ctx.set_active(&obj, false).unwrap();
        ctx.set_active(&obj, false).unwrap();
        let report = physical_tick(&ctx, &ex);
        assert_eq!((report.registered, report.moved), (0, 1));
        assert_eq!(ctx.pool().inactive_len(), 1);
        assert_eq!(ctx.stats().registered(), 1);
    }

    #[test]
    fn steps_see_edges_then_buffer_is_flushed() {
        let (ctx, ex) = make_env();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        ctx.create(move |_| {
            GameObject::builder("watcher")
                .on_step(move |_, ctx| {
                    if ctx.input().is_pressed(Key::Space) {
                        s.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .build()
        })
        .unwrap();

        ctx.input_feed().press(Key::Space);
        physical_tick(&ctx, &ex);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(ctx.input().edges_empty());

        physical_tick(&ctx, &ex);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn previous_position_matches_end_of_tick() {
        let (ctx, ex) = make_env();
        let obj = ctx
            .create(|_| {
                GameObject::builder("mover")
                    .with_component(Transform2D::new(Vec2::ZERO))
                    .on_step(|obj, _| {
                        if let Some(t) = obj.transform() {
                            t.translate(Vec2::new(1.0, 0.0));
                        }
                    })
                    .build()
            })
            .unwrap();

        for expected in 1..=3 {
            let report = physical_tick(&ctx, &ex);
            assert_eq!(report.memorized, 1);
            let (prev, cur) = obj.transform().unwrap().snapshot();
            assert_eq!(prev, cur);
            assert_eq!(cur, Vec2::new(expected as f32, 0.0));
        }
    }

    #[test]
    fn clock_and_stats_advance() {
        let (ctx, ex) = make_env();
        physical_tick(&ctx, &ex);
        let report = physical_tick(&ctx, &ex);
        assert_eq!(report.tick, 2);
        assert_eq!(ctx.time().tick, 2);
        assert_eq!(ctx.stats().ticks(), 2);
    }
}
