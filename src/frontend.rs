//! Window and render-loop seam.
//!
//! The scheduling core never talks to a graphics API. It asks a [`Frontend`]
//! to open a window and then hands it a [`RenderLoop`] plus a per-frame
//! callback; the frontend blocks the calling thread, invoking the callback at
//! the render rate, until the kill watcher fires. Closing the window is the
//! frontend's job.
//!
//! [`HeadlessFrontend`] drives the same contract without any window and is
//! what the demo binary and the tests use.

use std::time::Duration;

use crossbeam_channel::{Receiver, select, tick};
use log::{debug, info};

use crate::error::EngineResult;
use crate::events::input::InputEvent;
use crate::resources::input::InputFeed;

pub use crate::resources::gameconfig::Resolution;

/// Opaque handle returned by [`Frontend::open_window`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowHandle {
    pub id: u64,
    pub resolution: Resolution,
    pub title: String,
}

/// Everything a frontend needs to drive frames.
#[derive(Debug)]
pub struct RenderLoop {
    pub window: WindowHandle,
    /// Time between two frames.
    pub period: Duration,
    /// Disconnects when the application is killed.
    pub kill: Receiver<()>,
    /// Where polled input goes.
    pub input: InputFeed,
}

pub trait Frontend {
    fn open_window(&mut self, resolution: Resolution, title: &str) -> EngineResult<WindowHandle>;

    /// Call `on_frame` once per render tick until `render_loop.kill` fires.
    fn run(&mut self, render_loop: RenderLoop, on_frame: &mut dyn FnMut()) -> EngineResult<()>;
}

/// Frontend without a window.
///
/// Optionally stops on its own after a frame budget, and replays scripted
/// input events right before given frames.
#[derive(Debug, Default)]
pub struct HeadlessFrontend {
    max_frames: Option<u64>,
    script: Vec<(u64, InputEvent)>,
    frames: u64,
    windows_opened: u64,
}

impl HeadlessFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return from `run` after `frames` frames even if nobody killed the
    /// application.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Push `event` before frame `frame` (1-based) is drawn.
    pub fn with_input(mut self, frame: u64, event: InputEvent) -> Self {
        self.script.push((frame, event));
        self
    }

    /// Frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Frontend for HeadlessFrontend {
    fn open_window(&mut self, resolution: Resolution, title: &str) -> EngineResult<WindowHandle> {
        self.windows_opened += 1;
        info!(
            "headless window `{}` {}x{}",
            title, resolution.width, resolution.height
        );
        Ok(WindowHandle {
            id: self.windows_opened,
            resolution,
            title: title.to_string(),
        })
    }

    fn run(&mut self, render_loop: RenderLoop, on_frame: &mut dyn FnMut()) -> EngineResult<()> {
        let ticker = tick(render_loop.period);
        loop {
            select! {
                recv(render_loop.kill) -> _ => break,
                recv(ticker) -> _ => {
                    let next = self.frames + 1;
                    for (_, event) in self.script.iter().filter(|(f, _)| *f == next) {
                        render_loop.input.push(*event);
                    }
                    on_frame();
                    self.frames = next;
                    if self.max_frames.is_some_and(|max| self.frames >= max) {
                        debug!("frame limit reached");
                        break;
                    }
                }
            }
        }
        info!(
            "window {} closed after {} frames",
            render_loop.window.id, self.frames
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::input::Key;
    use crate::resources::input::InputBuffer;
    use crate::sync::ShutdownSignal;
    use std::sync::Arc;

    fn make_loop(kill: &ShutdownSignal, buffer: &Arc<InputBuffer>) -> RenderLoop {
        RenderLoop {
            window: WindowHandle {
                id: 1,
                resolution: Resolution {
                    width: 64,
                    height: 64,
                },
                title: "test".into(),
            },
            period: Duration::from_millis(1),
            kill: kill.watcher(),
            input: InputFeed::new(Arc::clone(buffer)),
        }
    }

    #[test]
    fn frame_limit_stops_the_loop() {
        let kill = ShutdownSignal::new();
        let buffer = Arc::new(InputBuffer::new());
        let mut fe = HeadlessFrontend::new().with_frame_limit(5);
        let mut count = 0;
        fe.run(make_loop(&kill, &buffer), &mut || count += 1).unwrap();
        assert_eq!(count, 5);
        assert_eq!(fe.frames(), 5);
    }

    #[test]
    fn kill_stops_the_loop_immediately() {
        let kill = ShutdownSignal::new();
        kill.kill().unwrap();
        let buffer = Arc::new(InputBuffer::new());
        let mut fe = HeadlessFrontend::new();
        fe.run(make_loop(&kill, &buffer), &mut || {}).unwrap();
        assert_eq!(fe.frames(), 0);
    }

    #[test]
    fn scripted_input_arrives_before_its_frame() {
        let kill = ShutdownSignal::new();
        let buffer = Arc::new(InputBuffer::new());
        let mut fe = HeadlessFrontend::new()
            .with_frame_limit(3)
            .with_input(2, InputEvent::press(Key::Enter));
        let mut held_at = Vec::new();
        let reader = Arc::clone(&buffer);
        fe.run(make_loop(&kill, &buffer), &mut || held_at.push(reader.is_held(Key::Enter)))
            .unwrap();
        assert_eq!(held_at, vec![false, true, true]);
    }
}
