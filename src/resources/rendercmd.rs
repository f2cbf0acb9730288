//! Deferred draw commands.
//!
//! Code running on the physical thread (systems, step callbacks) cannot
//! touch the graphics context. It queues closures here instead; the render
//! pass runs them after every object's render callback.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::systems::render::FrameInfo;

pub type RenderCommand = Box<dyn FnOnce(&FrameInfo) + Send>;

/// Multi-producer queue drained once per render frame.
pub struct RenderCommandQueue {
    tx: Sender<RenderCommand>,
    rx: Receiver<RenderCommand>,
}

impl std::fmt::Debug for RenderCommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCommandQueue")
            .field("pending", &self.rx.len())
            .finish()
    }
}

impl Default for RenderCommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderCommandQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn push<F>(&self, cmd: F)
    where
        F: FnOnce(&FrameInfo) + Send + 'static,
    {
        // the receiver lives as long as self
        let _ = self.tx.send(Box::new(cmd));
    }

    /// Clonable producer handle for code that outlives a borrow of the queue.
    pub fn sender(&self) -> Sender<RenderCommand> {
        self.tx.clone()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Run the commands queued when the call started, in submission order.
    pub(crate) fn drain(&self, frame: &FrameInfo) -> usize {
        let pending = self.rx.len();
        let mut ran = 0;
        for cmd in self.rx.try_iter().take(pending) {
            cmd(frame);
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn drain_runs_commands_in_order() {
        let queue = RenderCommandQueue::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let seen = Arc::clone(&seen);
            queue.push(move |_| seen.lock().push(i));
        }
        let sender = queue.sender();
        let late = Arc::clone(&seen);
        sender
            .send(Box::new(move |f: &FrameInfo| late.lock().push(f.frame as i32 * 10)))
            .unwrap();

        let frame = FrameInfo { frame: 7, alpha: 0.0 };
        assert_eq!(queue.drain(&frame), 4);
        assert_eq!(*seen.lock(), vec![0, 1, 2, 70]);
        assert!(queue.is_empty());
    }
}
