//! Sprite frame state and render depth.
//!
//! Texture lookup and drawing belong to the render frontend. The engine only
//! needs two things from a sprite: the depth used to order the draw list, and
//! a frame counter advanced once per physical tick.

use parking_lot::Mutex;

use crate::components::Component;

#[derive(Debug, Clone)]
struct SpriteState {
    depth: i32,
    frame_index: usize,
    tick_accum: u32,
    animating: bool,
}

/// Sprite is identified by an asset key, a depth and a frame strip.
///
/// Larger depth means farther away; the render pass draws far to near.
#[derive(Debug)]
pub struct Sprite {
    key: String,
    frame_count: usize,
    ticks_per_frame: u32,
    state: Mutex<SpriteState>,
}

impl Component for Sprite {
    const NAME: &'static str = "Sprite";
}

impl Sprite {
    /// A single-frame sprite at `depth`.
    pub fn new(key: impl Into<String>, depth: i32) -> Self {
        Self {
            key: key.into(),
            frame_count: 1,
            ticks_per_frame: 1,
            state: Mutex::new(SpriteState {
                depth,
                frame_index: 0,
                tick_accum: 0,
                animating: true,
            }),
        }
    }

    /// Builder: `frame_count` frames, each shown for `ticks_per_frame`
    /// physical ticks. Zero values are treated as one.
    pub fn with_frames(mut self, frame_count: usize, ticks_per_frame: u32) -> Self {
        self.frame_count = frame_count.max(1);
        self.ticks_per_frame = ticks_per_frame.max(1);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn depth(&self) -> i32 {
        self.state.lock().depth
    }

    pub fn set_depth(&self, depth: i32) {
        self.state.lock().depth = depth;
    }

    pub fn frame_index(&self) -> usize {
        self.state.lock().frame_index
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn enable_animation(&self) {
        self.state.lock().animating = true;
    }

    /// Freeze on the current frame.
    pub fn disable_animation(&self) {
        self.state.lock().animating = false;
    }

    pub fn is_animating(&self) -> bool {
        self.state.lock().animating
    }

    /// Advance playback by one physical tick. Loops at the end of the strip.
    pub fn step_frame(&self) {
        let mut state = self.state.lock();
        if !state.animating || self.frame_count <= 1 {
            return;
        }
        state.tick_accum += 1;
        if state.tick_accum >= self.ticks_per_frame {
            state.tick_accum = 0;
            state.frame_index = (state.frame_index + 1) % self.frame_count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_frame_advances_and_loops() {
        let sprite = Sprite::new("spr_crate", 0).with_frames(3, 2);
        let mut seen = Vec::new();
        for _ in 0..6 {
            sprite.step_frame();
            seen.push(sprite.frame_index());
        }
        assert_eq!(seen, vec![0, 1, 1, 2, 2, 0]);
    }

    #[test]
    fn disabled_animation_holds_frame() {
        let sprite = Sprite::new("spr_player", 1).with_frames(4, 1);
        sprite.step_frame();
        sprite.disable_animation();
        sprite.step_frame();
        sprite.step_frame();
        assert_eq!(sprite.frame_index(), 1);
        sprite.enable_animation();
        sprite.step_frame();
        assert_eq!(sprite.frame_index(), 2);
    }

    #[test]
    fn zero_frame_values_are_clamped() {
        let sprite = Sprite::new("spr_x", 0).with_frames(0, 0);
        assert_eq!(sprite.frame_count(), 1);
        sprite.step_frame();
        assert_eq!(sprite.frame_index(), 0);
    }
}
