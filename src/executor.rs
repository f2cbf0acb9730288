//! Parallel task executor.
//!
//! A fixed pool of worker threads pulls boxed jobs from one shared
//! crossbeam channel. Each submission returns a [`TaskHandle`] the caller may
//! await or simply drop (fire-and-forget). Every task runs exactly once,
//! inside `catch_unwind`, so a failing or panicking task is logged and
//! counted without taking its worker down.
//!
//! With [`ExecutionMode::Inline`] no workers are spawned and each task runs
//! on the submitting thread. This is the single-threaded policy selected by
//! `multithreading = false`.
//!
//! # Lifecycle
//!
//! `Idle --run()--> Running --stop()--> Stopped`. Submitting outside
//! `Running` fails with [`EngineError::ExecutorStopped`]; `stop` closes the
//! queue, lets already queued tasks finish and joins the workers.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded, unbounded};
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use serde::Serialize;

use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult, TaskError};
use crate::sync::{WaitGroup, WaitGroupToken};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where submitted tasks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// On the worker pool.
    Threaded,
    /// On the submitting thread, before `async_execute` returns.
    Inline,
}

/// Task outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub panicked: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
}

enum ExecutorState {
    Idle,
    Running {
        // None in inline mode
        sender: Option<Sender<Job>>,
        workers: Vec<JoinHandle<()>>,
    },
    Stopped,
}

/// Result of one submitted task.
///
/// Dropping the handle discards the result; the task still runs.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task finishes.
    pub fn wait(self) -> Result<T, TaskError> {
        self.rx.recv().unwrap_or(Err(TaskError::Cancelled))
    }

    /// Block for at most `timeout`. `None` means still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, TaskError>> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(TaskError::Cancelled)),
        }
    }

    /// Non-blocking poll.
    pub fn try_take(&self) -> Option<Result<T, TaskError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(TaskError::Cancelled)),
        }
    }
}

/// Fixed-size worker pool.
pub struct Executor {
    parallelism: usize,
    mode: ExecutionMode,
    state: RwLock<ExecutorState>,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("parallelism", &self.parallelism)
            .field("mode", &self.mode)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Executor {
    /// `parallelism` below one is raised to one.
    pub fn new(parallelism: usize, mode: ExecutionMode) -> Self {
        Self {
            parallelism: parallelism.max(1),
            mode,
            state: RwLock::new(ExecutorState::Idle),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.read(), ExecutorState::Running { .. })
    }

    /// Spawn the workers. Fails if the executor already ran.
    pub fn run(&self) -> EngineResult<()> {
        let mut state = self.state.write();
        if !matches!(*state, ExecutorState::Idle) {
            return Err(EngineError::ExecutorAlreadyRunning);
        }

        if self.mode == ExecutionMode::Inline {
            info!("executor running inline");
            *state = ExecutorState::Running {
                sender: None,
                workers: Vec::new(),
            };
            return Ok(());
        }

        let (sender, receiver) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(self.parallelism);
        for i in 0..self.parallelism {
            let name = format!("executor-{}", i);
            let rx = receiver.clone();
            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(rx));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    drop(sender);
                    for w in workers {
                        let _ = w.join();
                    }
                    *state = ExecutorState::Stopped;
                    return Err(EngineError::Spawn { name, source });
                }
            }
        }

        info!("executor running with {} workers", self.parallelism);
        *state = ExecutorState::Running {
            sender: Some(sender),
            workers,
        };
        Ok(())
    }

    /// Submit a task. The returned handle may be dropped.
    pub fn async_execute<T, F>(&self, task: F) -> EngineResult<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, TaskError> + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let job = wrap(task, Arc::clone(&self.counters), tx);
        self.dispatch(job)?;
        Ok(TaskHandle { rx })
    }

    /// Submit a task counted by `group`. The group is released when the task
    /// finishes, or immediately if the submission is rejected.
    pub fn async_execute_in<T, F>(&self, group: &Arc<WaitGroup>, task: F) -> EngineResult<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, TaskError> + Send + 'static,
    {
        group.add(1);
        let token = WaitGroupToken(Arc::clone(group));
        self.async_execute(move || {
            let _token = token;
            task()
        })
    }

    fn dispatch(&self, job: Job) -> EngineResult<()> {
        // clone the sender out so the lock is not held while a task runs
        let sender = match &*self.state.read() {
            ExecutorState::Running { sender, .. } => sender.clone(),
            _ => return Err(EngineError::ExecutorStopped),
        };
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        match sender {
            Some(sender) => sender.send(job).map_err(|_| {
                self.counters.submitted.fetch_sub(1, Ordering::Relaxed);
                EngineError::ExecutorStopped
            }),
            None => {
                job();
                Ok(())
            }
        }
    }

    /// Close the queue, run what is already queued, join the workers.
    /// Calling it again is a no-op.
    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.state.write(), ExecutorState::Stopped);
        let ExecutorState::Running { sender, workers } = previous else {
            return;
        };
        drop(sender);
        let count = workers.len();
        for w in workers {
            let name = w.thread().name().unwrap_or("executor").to_string();
            if w.join().is_err() {
                error!("worker `{}` exited abnormally", name);
            }
        }
        info!("executor stopped ({} workers joined)", count);
    }

    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(rx: Receiver<Job>) {
    for job in rx.iter() {
        job();
    }
    debug!(
        "{} exiting",
        thread::current().name().unwrap_or("executor worker")
    );
}

fn wrap<T, F>(task: F, counters: Arc<Counters>, result_tx: Sender<Result<T, TaskError>>) -> Job
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TaskError> + Send + 'static,
{
    Box::new(move || {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(value)) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            Ok(Err(err)) => {
                warn!("{}", err);
                counters.failed.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                error!("task panicked: {}", msg);
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                Err(TaskError::Panicked(msg))
            }
        };
        // receiver gone means fire-and-forget
        let _ = result_tx.send(outcome);
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// What a system receives once per physical tick.
///
/// Tasks submitted through [`TickScope::submit`] are tied to the tick's
/// wait group, so they are finished before positions are memorized.
pub struct TickScope<'a> {
    executor: &'a Executor,
    group: &'a Arc<WaitGroup>,
    ctx: &'a Arc<EngineContext>,
}

impl<'a> TickScope<'a> {
    pub fn new(executor: &'a Executor, group: &'a Arc<WaitGroup>, ctx: &'a Arc<EngineContext>) -> Self {
        Self {
            executor,
            group,
            ctx,
        }
    }

    pub fn submit<T, F>(&self, task: F) -> EngineResult<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, TaskError> + Send + 'static,
    {
        self.executor.async_execute_in(self.group, task)
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        self.ctx
    }

    pub fn executor(&self) -> &Executor {
        self.executor
    }

    pub fn wait_group(&self) -> &Arc<WaitGroup> {
        self.group
    }
}
