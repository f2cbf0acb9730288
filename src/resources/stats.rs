//! Run counters and the end-of-run report.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::executor::ExecutorStats;

/// Counters bumped by the two loops.
#[derive(Debug, Default)]
pub struct EngineStats {
    ticks: AtomicU64,
    frames: AtomicU64,
    registered: AtomicU64,
    unregistered: AtomicU64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_tick(&self, registered: usize, unregistered: usize) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.registered.fetch_add(registered as u64, Ordering::Relaxed);
        self.unregistered
            .fetch_add(unregistered as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Objects that entered the pool.
    pub fn registered(&self) -> u64 {
        self.registered.load(Ordering::Relaxed)
    }

    /// Objects removed from the pool.
    pub fn unregistered(&self) -> u64 {
        self.unregistered.load(Ordering::Relaxed)
    }
}

/// Snapshot printed by the demo binary once the application exits.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub ticks: u64,
    pub frames: u64,
    pub registered: u64,
    pub unregistered: u64,
    pub active_objects: usize,
    pub inactive_objects: usize,
    pub executor: ExecutorStats,
}
