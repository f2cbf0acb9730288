//! Render pass.
//!
//! Runs on the render thread at its own rate. The active pool's read lock is
//! held from snapshot to the last render callback, so the physical thread
//! cannot drain requests halfway through a frame. Render callbacks must not
//! take pool locks themselves.
//!
//! Objects are drawn far to near: descending depth, with a stable sort so
//! equal depths keep pool iteration order (label, then object id).

use std::cmp::Reverse;
use std::sync::Arc;

use log::trace;

use crate::context::EngineContext;
use crate::gameobject::GameObject;

/// Per-frame data handed to render callbacks and render commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// 1-based render frame number.
    pub frame: u64,
    /// Progress into the current physical tick, for interpolation.
    pub alpha: f32,
}

/// Sort `objects` into draw order.
pub fn build_draw_list<'a, I>(objects: I) -> Vec<&'a Arc<GameObject>>
where
    I: IntoIterator<Item = &'a Arc<GameObject>>,
{
    let mut list: Vec<&Arc<GameObject>> = objects.into_iter().collect();
    list.sort_by_key(|obj| Reverse(obj.depth()));
    list
}

/// Draw one frame: object render callbacks in depth order, then every
/// queued render command. Returns how many objects were drawn.
pub fn render_pass(ctx: &EngineContext, frame: &FrameInfo) -> usize {
    let drawn = {
        let active = ctx.pool().read_active();
        let list = build_draw_list(active.iter());
        for obj in &list {
            obj.render(frame);
        }
        list.len()
    };
    let commands = ctx.render_commands().drain(frame);
    ctx.stats().record_frame();
    trace!(
        "frame {}: {} objects, {} commands",
        frame.frame, drawn, commands
    );
    drawn
}
