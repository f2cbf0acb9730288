//! Bounded register/unregister request queues.
//!
//! Producers on any thread submit [`ResourceAccessRequest`]s; the physical
//! loop is the only consumer. A full queue is reported back as
//! [`EngineError::QueueFull`] so the caller decides whether to retry, wait
//! ([`RequestQueue::submit_timeout`]) or drop the request.

use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError, bounded};

use crate::error::{EngineError, EngineResult, QueueKind};
use crate::events::request::ResourceAccessRequest;

/// Default capacity of each queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// One bounded multi-producer queue.
#[derive(Debug)]
pub struct RequestQueue {
    kind: QueueKind,
    capacity: usize,
    tx: Sender<ResourceAccessRequest>,
    rx: Receiver<ResourceAccessRequest>,
}

impl RequestQueue {
    pub fn new(kind: QueueKind, capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            kind,
            capacity,
            tx,
            rx,
        }
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests waiting to be drained.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Enqueue without blocking.
    pub fn submit(&self, req: ResourceAccessRequest) -> EngineResult<()> {
        self.tx.try_send(req).map_err(|e| match e {
            TrySendError::Full(req) => {
                log::warn!(
                    "{} queue full ({}), rejecting `{}`",
                    self.kind,
                    self.capacity,
                    req.object.name()
                );
                EngineError::QueueFull {
                    queue: self.kind,
                    capacity: self.capacity,
                }
            }
            TrySendError::Disconnected(_) => EngineError::QueueClosed(self.kind),
        })
    }

    /// Enqueue, waiting up to `timeout` for room.
    pub fn submit_timeout(&self, req: ResourceAccessRequest, timeout: Duration) -> EngineResult<()> {
        self.tx.send_timeout(req, timeout).map_err(|e| match e {
            SendTimeoutError::Timeout(_) => EngineError::QueueFull {
                queue: self.kind,
                capacity: self.capacity,
            },
            SendTimeoutError::Disconnected(_) => EngineError::QueueClosed(self.kind),
        })
    }

    /// Hand every request queued at the moment of the call to `f`. Requests
    /// that arrive while draining wait for the next drain.
    pub fn drain(&self, mut f: impl FnMut(ResourceAccessRequest)) -> usize {
        let pending = self.rx.len();
        let mut drained = 0;
        for req in self.rx.try_iter().take(pending) {
            f(req);
            drained += 1;
        }
        drained
    }
}

/// The register and unregister queues of one engine.
#[derive(Debug)]
pub struct RequestQueues {
    pub register: RequestQueue,
    pub unregister: RequestQueue,
}

impl RequestQueues {
    pub fn new(capacity: usize) -> Self {
        Self {
            register: RequestQueue::new(QueueKind::Register, capacity),
            unregister: RequestQueue::new(QueueKind::Unregister, capacity),
        }
    }
}

impl Default for RequestQueues {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
