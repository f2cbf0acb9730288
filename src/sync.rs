//! Synchronization primitives shared by the loops.
//!
//! - [`InstanceSlot`] enforces "one application per process" with a
//!   compare-and-swap flag owned by a guard instead of a bare global.
//! - [`ShutdownSignal`] is the one-shot kill switch observed by the physical
//!   loop and the render loop.
//! - [`WaitGroup`] is the per-tick barrier between submitted system work and
//!   the memorize phase.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::{Condvar, Mutex};

use crate::error::{EngineError, EngineResult};

static GLOBAL_SLOT: OnceLock<Arc<InstanceSlot>> = OnceLock::new();

/// Slot that at most one live [`InstanceGuard`] can hold.
#[derive(Debug, Default)]
pub struct InstanceSlot {
    taken: AtomicBool,
}

impl InstanceSlot {
    /// Create an isolated slot.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The process-wide slot used by [`ApplicationBuilder::build`](crate::app::ApplicationBuilder::build).
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL_SLOT.get_or_init(InstanceSlot::new))
    }

    /// Take the slot, failing if a guard is still alive.
    pub fn acquire(self: &Arc<Self>) -> EngineResult<InstanceGuard> {
        self.taken
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EngineError::AlreadyConstructed)?;
        Ok(InstanceGuard {
            slot: Arc::clone(self),
        })
    }

    /// Whether a guard currently holds the slot.
    pub fn is_taken(&self) -> bool {
        self.taken.load(Ordering::Acquire)
    }
}

/// Proof of slot ownership. Dropping it frees the slot.
#[derive(Debug)]
pub struct InstanceGuard {
    slot: Arc<InstanceSlot>,
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        self.slot.taken.store(false, Ordering::Release);
    }
}

/// One-shot shutdown broadcast.
///
/// Nothing is ever sent on the underlying channel; `kill` drops the sender so
/// every watcher's `recv` (or `select!` arm) wakes with a disconnect.
#[derive(Debug)]
pub struct ShutdownSignal {
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
    killed: AtomicBool,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
            killed: AtomicBool::new(false),
        }
    }

    /// Fire the signal. Only the first call succeeds.
    pub fn kill(&self) -> EngineResult<()> {
        let sender = self.sender.lock().take();
        match sender {
            Some(sender) => {
                self.killed.store(true, Ordering::Release);
                drop(sender);
                Ok(())
            }
            None => Err(EngineError::AlreadyKilled),
        }
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once the signal fires.
    pub fn watcher(&self) -> Receiver<()> {
        self.receiver.clone()
    }
}

/// Fires a [`ShutdownSignal`] if the owning thread unwinds.
pub(crate) struct KillOnUnwind(pub Arc<ShutdownSignal>);

impl Drop for KillOnUnwind {
    fn drop(&mut self) {
        if std::thread::panicking() {
            log::error!("loop thread is unwinding, signalling shutdown");
            let _ = self.0.kill();
        }
    }
}

/// Counter that lets one thread wait for a batch of tasks.
#[derive(Debug, Default)]
pub struct WaitGroup {
    pending: Mutex<usize>,
    cond: Condvar,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: usize) {
        *self.pending.lock() += n;
    }

    pub fn done(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.cond.notify_all();
        }
    }

    pub fn pending(&self) -> usize {
        *self.pending.lock()
    }

    /// Block until every added unit called [`done`](Self::done).
    pub fn wait(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.cond.wait(&mut pending);
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    /// Returns `true` if the group drained in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pending = self.pending.lock();
        while *pending > 0 {
            if self.cond.wait_until(&mut pending, deadline).timed_out() {
                return *pending == 0;
            }
        }
        true
    }
}

/// Calls [`WaitGroup::done`] on drop, so a unit is released even on unwind.
pub(crate) struct WaitGroupToken(pub Arc<WaitGroup>);

impl Drop for WaitGroupToken {
    fn drop(&mut self) {
        self.0.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn slot_rejects_second_guard_until_first_dropped() {
        let slot = InstanceSlot::new();
        let guard = slot.acquire().unwrap();
        assert!(matches!(
            slot.acquire(),
            Err(EngineError::AlreadyConstructed)
        ));
        drop(guard);
        assert!(!slot.is_taken());
        assert!(slot.acquire().is_ok());
    }

    #[test]
    fn shutdown_second_kill_is_an_error() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_killed());
        signal.kill().unwrap();
        assert!(signal.is_killed());
        assert!(matches!(signal.kill(), Err(EngineError::AlreadyKilled)));
    }

    #[test]
    fn shutdown_wakes_every_watcher() {
        let signal = Arc::new(ShutdownSignal::new());
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let watcher = signal.watcher();
                thread::spawn(move || watcher.recv().is_err())
            })
            .collect();
        signal.kill().unwrap();
        for h in handles {
            assert!(h.join().unwrap());
        }
    }

    #[test]
    fn wait_group_blocks_until_done() {
        let group = Arc::new(WaitGroup::new());
        group.add(4);
        for _ in 0..4 {
            let token = WaitGroupToken(Arc::clone(&group));
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                drop(token);
            });
        }
        group.wait();
        assert_eq!(group.pending(), 0);
    }

    #[test]
    fn wait_group_timeout_reports_pending() {
        let group = WaitGroup::new();
        group.add(1);
        assert!(!group.wait_timeout(Duration::from_millis(10)));
        group.done();
        assert!(group.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn wait_group_timeout_is_not_extended_by_wakeups() {
        let group = Arc::new(WaitGroup::new());
        group.add(1);
        let stop = Arc::new(AtomicBool::new(false));
        let (g, s) = (Arc::clone(&group), Arc::clone(&stop));
        let nudger = thread::spawn(move || {
            let until = Instant::now() + Duration::from_secs(1);
            while !s.load(Ordering::SeqCst) && Instant::now() < until {
                g.cond.notify_all();
                thread::sleep(Duration::from_millis(5));
            }
        });

        let started = Instant::now();
        assert!(!group.wait_timeout(Duration::from_millis(50)));
        let waited = started.elapsed();
        stop.store(true, Ordering::SeqCst);
        nudger.join().unwrap();
        assert!(waited >= Duration::from_millis(50));
        assert!(waited < Duration::from_millis(500));
    }
}
