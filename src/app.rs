//! Application driver.
//!
//! An [`Application`] owns the engine context, the executor and the physical
//! loop thread. Lifecycle:
//!
//! ```text
//! build()          start(frontend)            kill() / frontend returns
//! ------> Initialized -------------> Running ------------------------> wait() -> Exited
//! ```
//!
//! `start` runs the user init hook, starts the executor, spawns the
//! `physical-loop` thread and then blocks inside the frontend's render loop
//! on the calling thread. The physical thread enables every system and
//! services two sources with `select!`: its fixed-rate ticker and the kill
//! watcher. Whichever fires first wins.
//!
//! Only one application may be alive per [`InstanceSlot`]; `build` uses the
//! process-wide slot.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, tick};
use log::{error, info, warn};

use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::executor::{ExecutionMode, Executor};
use crate::frontend::{Frontend, RenderLoop};
use crate::resources::gameconfig::AppConfig;
use crate::resources::stats::RunReport;
use crate::sync::{InstanceGuard, InstanceSlot, KillOnUnwind, ShutdownSignal};
use crate::systems::System;
use crate::systems::render::{FrameInfo, render_pass};
use crate::systems::tick::physical_tick;

/// Runs once on the calling thread before the loops start.
pub type InitFn = Box<dyn FnOnce(&Arc<EngineContext>) -> EngineResult<()> + Send>;
/// Runs on the render thread after each frame's objects and commands.
pub type RenderHook = Box<dyn FnMut(&EngineContext, &FrameInfo) + Send>;

const PHYSICAL_THREAD: &str = "physical-loop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Initialized,
    Running,
    Exited,
}

pub struct ApplicationBuilder {
    config: AppConfig,
    init: Option<InitFn>,
    render: Option<RenderHook>,
    systems: Vec<Arc<dyn System>>,
}

impl ApplicationBuilder {
    pub fn init<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Arc<EngineContext>) -> EngineResult<()> + Send + 'static,
    {
        self.init = Some(Box::new(f));
        self
    }

    pub fn render<F>(mut self, f: F) -> Self
    where
        F: FnMut(&EngineContext, &FrameInfo) + Send + 'static,
    {
        self.render = Some(Box::new(f));
        self
    }

    pub fn system(mut self, system: Arc<dyn System>) -> Self {
        self.systems.push(system);
        self
    }

    /// Build against the process-wide instance slot.
    pub fn build(self) -> EngineResult<Application> {
        self.build_in(&InstanceSlot::global())
    }

    /// Build against `slot`. Fails with
    /// [`EngineError::AlreadyConstructed`] while another application built
    /// on the same slot is alive.
    pub fn build_in(self, slot: &Arc<InstanceSlot>) -> EngineResult<Application> {
        let mut config = self.config;
        config.validate()?;
        let guard = slot.acquire()?;

        let ctx = EngineContext::new(&config);
        for system in self.systems {
            ctx.add_system(system)?;
        }

        let mode = if config.multithreading {
            ExecutionMode::Threaded
        } else {
            ExecutionMode::Inline
        };
        let executor = Arc::new(Executor::new(config.parallelism, mode));

        info!(
            "application initialized: physical={}Hz render={}Hz workers={} mode={:?}",
            config.physical_fps, config.render_fps, config.parallelism, mode
        );

        Ok(Application {
            config,
            ctx,
            executor,
            init: self.init,
            render: self.render,
            state: AppState::Initialized,
            physical: None,
            _guard: guard,
        })
    }
}

pub struct Application {
    config: AppConfig,
    ctx: Arc<EngineContext>,
    executor: Arc<Executor>,
    init: Option<InitFn>,
    render: Option<RenderHook>,
    state: AppState,
    physical: Option<JoinHandle<()>>,
    _guard: InstanceGuard,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("state", &self.state)
            .field("ctx", &self.ctx)
            .field("executor", &self.executor)
            .finish()
    }
}

impl Application {
    pub fn builder(config: AppConfig) -> ApplicationBuilder {
        ApplicationBuilder {
            config,
            init: None,
            render: None,
            systems: Vec::new(),
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.ctx
    }

    /// Start both loops and block in the render loop until it exits.
    ///
    /// When the frontend returns on its own (window closed, frame budget
    /// spent) the kill signal is fired so the physical loop follows. Call
    /// [`wait`](Self::wait) afterwards to join it.
    pub fn start(&mut self, frontend: &mut dyn Frontend) -> EngineResult<()> {
        if self.state != AppState::Initialized {
            return Err(EngineError::AlreadyStarted);
        }

        let window = match frontend.open_window(self.config.resolution, &self.config.title) {
            Ok(window) => window,
            Err(e) => {
                self.state = AppState::Exited;
                return Err(e);
            }
        };

        if let Some(init) = self.init.take() {
            if let Err(e) = init(&self.ctx) {
                self.state = AppState::Exited;
                return Err(e);
            }
        }

        if let Err(e) = self.executor.run() {
            self.state = AppState::Exited;
            return Err(e);
        }

        let ctx = Arc::clone(&self.ctx);
        let executor = Arc::clone(&self.executor);
        let period = self.config.physical_period();
        let spawned = thread::Builder::new()
            .name(PHYSICAL_THREAD.to_string())
            .spawn(move || physical_loop(ctx, executor, period));
        match spawned {
            Ok(handle) => self.physical = Some(handle),
            Err(source) => {
                self.executor.stop();
                self.state = AppState::Exited;
                return Err(EngineError::Spawn {
                    name: PHYSICAL_THREAD.to_string(),
                    source,
                });
            }
        }
        self.state = AppState::Running;
        info!("application running");

        let render_loop = RenderLoop {
            window,
            period: self.config.render_period(),
            kill: self.ctx.shutdown().watcher(),
            input: self.ctx.input_feed(),
        };
        let ctx = Arc::clone(&self.ctx);
        let mut hook = self.render.take();
        let mut frame_no = 0u64;
        let mut on_frame = || {
            frame_no += 1;
            let frame = FrameInfo {
                frame: frame_no,
                alpha: ctx.clock().alpha(),
            };
            render_pass(&ctx, &frame);
            if let Some(hook) = hook.as_mut() {
                hook(&ctx, &frame);
            }
        };
        let result = frontend.run(render_loop, &mut on_frame);

        if !self.ctx.shutdown().is_killed() {
            // the physical loop may have fired it in between
            let _ = self.ctx.shutdown().kill();
        }
        if let Err(e) = &result {
            error!("render loop failed: {}", e);
        }
        result
    }

    /// Fire the kill signal. A second call returns
    /// [`EngineError::AlreadyKilled`].
    pub fn kill(&self) -> EngineResult<()> {
        self.ctx.shutdown().kill()
    }

    /// Handle another thread can use to kill the application while
    /// [`start`](Self::start) blocks.
    pub fn kill_handle(&self) -> Arc<ShutdownSignal> {
        Arc::clone(self.ctx.shutdown())
    }

    /// Block until the physical loop has exited, then stop the executor.
    pub fn wait(&mut self) -> EngineResult<()> {
        match self.state {
            AppState::Initialized => return Err(EngineError::NotStarted),
            AppState::Exited => return Ok(()),
            AppState::Running => {}
        }
        let joined = match self.physical.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        };
        self.executor.stop();
        self.state = AppState::Exited;
        info!(
            "application exited after {} ticks, {} frames",
            self.ctx.stats().ticks(),
            self.ctx.stats().frames()
        );
        joined.map_err(|_| EngineError::ThreadPanicked(PHYSICAL_THREAD.to_string()))
    }

    /// [`start`](Self::start) followed by [`wait`](Self::wait).
    pub fn run(&mut self, frontend: &mut dyn Frontend) -> EngineResult<()> {
        let started = self.start(frontend);
        if self.state != AppState::Running {
            return started;
        }
        let waited = self.wait();
        started.and(waited)
    }

    pub fn report(&self) -> RunReport {
        let stats = self.ctx.stats();
        RunReport {
            ticks: stats.ticks(),
            frames: stats.frames(),
            registered: stats.registered(),
            unregistered: stats.unregistered(),
            active_objects: self.ctx.pool().active_len(),
            inactive_objects: self.ctx.pool().inactive_len(),
            executor: self.executor.stats(),
        }
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        if self.state == AppState::Running {
            warn!("application dropped while running, shutting down");
            let _ = self.ctx.shutdown().kill();
            if let Some(handle) = self.physical.take() {
                let _ = handle.join();
            }
            self.executor.stop();
            self.state = AppState::Exited;
        }
    }
}

fn physical_loop(ctx: Arc<EngineContext>, executor: Arc<Executor>, period: std::time::Duration) {
    let _unwind = KillOnUnwind(Arc::clone(ctx.shutdown()));
    ctx.systems().enable_all();
    let kill = ctx.shutdown().watcher();
    let ticker = tick(period);
    info!("physical loop started ({:?} per tick)", period);
    loop {
        select! {
            recv(kill) -> _ => break,
            recv(ticker) -> _ => {
                physical_tick(&ctx, &executor);
            }
        }
    }
    info!("physical loop exiting after {} ticks", ctx.stats().ticks());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::HeadlessFrontend;

    fn make_config() -> AppConfig {
        AppConfig::new().with_rates(200, 200).with_parallelism(2, true)
    }

    #[test]
    fn second_instance_on_same_slot_fails() {
        let slot = InstanceSlot::new();
        let first = Application::builder(make_config()).build_in(&slot).unwrap();
        assert!(matches!(
            Application::builder(make_config()).build_in(&slot),
            Err(EngineError::AlreadyConstructed)
        ));
        drop(first);
        assert!(Application::builder(make_config()).build_in(&slot).is_ok());
    }

    #[test]
    fn invalid_config_is_rejected_before_taking_the_slot() {
        let slot = InstanceSlot::new();
        let bad = make_config().with_rates(0, 60);
        assert!(matches!(
            Application::builder(bad).build_in(&slot),
            Err(EngineError::InvalidConfig(_))
        ));
        assert!(!slot.is_taken());
    }

    #[test]
    fn wait_before_start_is_not_started() {
        let slot = InstanceSlot::new();
        let mut app = Application::builder(make_config()).build_in(&slot).unwrap();
        assert!(matches!(app.wait(), Err(EngineError::NotStarted)));
    }

    #[test]
    fn start_twice_fails() {
        let slot = InstanceSlot::new();
        let mut app = Application::builder(make_config()).build_in(&slot).unwrap();
        let mut fe = HeadlessFrontend::new().with_frame_limit(2);
        app.run(&mut fe).unwrap();
        assert_eq!(app.state(), AppState::Exited);
        assert!(matches!(app.start(&mut fe), Err(EngineError::AlreadyStarted)));
    }

    #[test]
    fn failing_init_aborts_start() {
        let slot = InstanceSlot::new();
        let mut app = Application::builder(make_config())
            .init(|_| Err(EngineError::Config("missing assets".into())))
            .build_in(&slot)
            .unwrap();
        let mut fe = HeadlessFrontend::new().with_frame_limit(1);
        assert!(matches!(app.run(&mut fe), Err(EngineError::Config(_))));
        assert_eq!(app.state(), AppState::Exited);
        assert_eq!(fe.frames(), 0);
    }
}
