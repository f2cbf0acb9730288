//! Demo scene: falling crates.
//!
//! A batch of crates with rigid bodies falls under gravity until it hits the
//! floor, where each crate stops and gets a small upward kick when Space is
//! pressed. A spawner object keeps the population moving: every few ticks
//! it creates a fresh crate and destroys the oldest one. Escape exits.

use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::components::rigidbody::{Impulse, RigidBody};
use crate::components::sprite::Sprite;
use crate::components::transform::Transform2D;
use crate::context::EngineContext;
use crate::error::EngineResult;
use crate::events::input::Key;
use crate::gameobject::{GameObject, Label};
use crate::math::Vec2;
use crate::systems::physics::Physics2DSystem;

pub const CRATE_LABEL: Label = Label::from_static("crate");
pub const SPAWNER_LABEL: Label = Label::from_static("spawner");

const GRAVITY_DIRECTION: f32 = 270.0;
const GRAVITY_ACCELERATION: f32 = 0.05;
const MAX_FALL_SPEED: f32 = 8.0;
const JUMP_SPEED: f32 = 3.0;
const JUMP_DECELERATION: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct SceneOptions {
    /// Crates created by [`setup_scene`].
    pub crates: usize,
    /// Spawner period in physical ticks; 0 disables the spawner.
    pub spawn_every: u64,
    pub width: f32,
    pub floor_y: f32,
    pub seed: u64,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            crates: 64,
            spawn_every: 30,
            width: 640.0,
            floor_y: 440.0,
            seed: 0x6a1a_c71c,
        }
    }
}

/// Populate the scene. Meant to be called from the application init hook.
pub fn setup_scene(ctx: &Arc<EngineContext>, opts: &SceneOptions) -> EngineResult<()> {
    let rng = Arc::new(Mutex::new(fastrand::Rng::with_seed(opts.seed)));
    for _ in 0..opts.crates {
        let x = rng.lock().f32() * opts.width;
        let y = rng.lock().f32() * opts.floor_y * 0.5;
        spawn_crate(ctx, Vec2::new(x, y), opts.floor_y, rng.lock().i32(0..3))?;
    }
    if opts.spawn_every > 0 {
        spawn_spawner(ctx, opts.clone(), rng)?;
    }
    debug!("scene ready with {} crates", opts.crates);
    Ok(())
}

/// Create one crate and subscribe it to the physics system.
pub fn spawn_crate(ctx: &EngineContext, pos: Vec2, floor_y: f32, depth: i32) -> EngineResult<Arc<GameObject>> {
    let obj = ctx.create(|_| {
        GameObject::builder("crate")
            .label(CRATE_LABEL)
            .with_component(Transform2D::new(pos))
            .with_component(
                RigidBody::new()
                    .with_gravity(GRAVITY_DIRECTION, GRAVITY_ACCELERATION)
                    .with_max_speed(MAX_FALL_SPEED),
            )
            .with_component(Sprite::new("spr_crate", depth).with_frames(4, 8))
            .on_step(move |obj, ctx| crate_step(obj, ctx, floor_y))
            .on_render(|obj, frame| {
                if let Some(t) = obj.transform() {
                    trace!("{} at {:?}", obj.id(), t.interpolated(frame.alpha));
                }
            })
            .build()
    })?;
    ctx.subscribe(&obj, Physics2DSystem::NAME)?;
    Ok(obj)
}

fn crate_step(obj: &GameObject, ctx: &EngineContext, floor_y: f32) {
    let (Some(transform), Some(body)) = (obj.transform(), obj.component::<RigidBody>()) else {
        return;
    };
    let pos = transform.position();
    if pos.y >= floor_y {
        transform.set_position(Vec2::new(pos.x, floor_y));
        body.set_gravity_enabled(false);
        if ctx.input().is_pressed(Key::Space) {
            body.add_impulse(Impulse::new(90.0, JUMP_SPEED, JUMP_DECELERATION));
        }
    } else {
        body.set_gravity_enabled(true);
    }

    if let Some(sprite) = obj.sprite() {
        if body.velocity().length() > 0.0 {
            sprite.enable_animation();
        } else {
            sprite.disable_animation();
        }
    }
}

fn spawn_spawner(ctx: &EngineContext, opts: SceneOptions, rng: Arc<Mutex<fastrand::Rng>>) -> EngineResult<Arc<GameObject>> {
    ctx.create(move |_| {
        GameObject::builder("spawner")
            .label(SPAWNER_LABEL)
            .on_step(move |_, ctx| {
                if ctx.input().is_pressed(Key::Escape) {
                    let _ = ctx.exit();
                    return;
                }
                let tick = ctx.time().tick;
                if tick == 0 || tick % opts.spawn_every != 0 {
                    return;
                }
                let (x, depth) = {
                    let mut rng = rng.lock();
                    (rng.f32() * opts.width, rng.i32(0..3))
                };
                if let Err(e) = spawn_crate(ctx, Vec2::new(x, 0.0), opts.floor_y, depth) {
                    warn!("spawner could not create a crate: {}", e);
                }
                // lowest id is the oldest
                if let Some(oldest) = ctx.pool().active_with_label(&CRATE_LABEL).into_iter().next() {
                    if let Err(e) = ctx.destroy(&oldest) {
                        warn!("spawner could not destroy {}: {}", oldest.id(), e);
                    }
                }
            })
            .build()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutionMode, Executor};
    use crate::resources::gameconfig::AppConfig;
    use crate::systems::tick::physical_tick;

    fn make_ctx() -> Arc<EngineContext> {
        let ctx = EngineContext::new(&AppConfig::new());
        ctx.add_system(Arc::new(Physics2DSystem::new(0))).unwrap();
        ctx.systems().enable_all();
        ctx
    }

    #[test]
    fn crates_fall_and_land_on_the_floor() {
        let ctx = make_ctx();
        let ex = Executor::new(2, ExecutionMode::Threaded);
        ex.run().unwrap();
        let obj = spawn_crate(&ctx, Vec2::new(10.0, 0.0), 20.0, 0).unwrap();

        for _ in 0..200 {
            physical_tick(&ctx, &ex);
        }
        let pos = obj.transform().unwrap().position();
        assert!(pos.y >= 20.0);
        assert!(pos.y < 20.0 + MAX_FALL_SPEED + 1.0);
    }

    #[test]
    fn spawner_keeps_population_constant() {
        let ctx = make_ctx();
        let ex = Executor::new(1, ExecutionMode::Inline);
        ex.run().unwrap();
        let opts = SceneOptions {
            crates: 5,
            spawn_every: 2,
            ..SceneOptions::default()
        };
        setup_scene(&ctx, &opts).unwrap();

        for _ in 0..20 {
            physical_tick(&ctx, &ex);
        }
        assert_eq!(ctx.pool().active_with_label(&CRATE_LABEL).len(), 5);
        assert!(ctx.stats().unregistered() > 0);
    }
}
