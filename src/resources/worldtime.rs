//! Simulation time.
//!
//! The physical loop owns the only writer path ([`TickClock::advance`]);
//! step callbacks read a [`WorldTime`] copy, and the render loop asks for the
//! interpolation factor between the last two physical ticks.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Copy of the clock handed to readers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTime {
    /// Completed physical ticks.
    pub tick: u64,
    /// Scaled seconds per physical tick.
    pub delta: f32,
    /// Scaled seconds simulated so far.
    pub elapsed: f32,
    pub time_scale: f32,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            tick: 0,
            delta: 0.0,
            elapsed: 0.0,
            time_scale: 1.0,
        }
    }
}

#[derive(Debug)]
struct ClockState {
    tick: u64,
    elapsed: f32,
    time_scale: f32,
    last_tick_at: Option<Instant>,
}

/// Fixed-period tick counter.
#[derive(Debug)]
pub struct TickClock {
    period: Duration,
    state: Mutex<ClockState>,
}

impl TickClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            state: Mutex::new(ClockState {
                tick: 0,
                elapsed: 0.0,
                time_scale: 1.0,
                last_tick_at: None,
            }),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Record one completed physical tick. Returns the new tick count.
    pub(crate) fn advance(&self) -> u64 {
        let mut st = self.state.lock();
        st.tick += 1;
        st.elapsed += self.period.as_secs_f32() * st.time_scale;
        st.last_tick_at = Some(Instant::now());
        st.tick
    }

    pub fn now(&self) -> WorldTime {
        let st = self.state.lock();
        WorldTime {
            tick: st.tick,
            delta: self.period.as_secs_f32() * st.time_scale,
            elapsed: st.elapsed,
            time_scale: st.time_scale,
        }
    }

    /// Slow down or speed up simulated time. Negative values are treated as 0.
    pub fn set_time_scale(&self, scale: f32) {
        self.state.lock().time_scale = scale.max(0.0);
    }

    /// How far the wall clock is into the current physical period, in
    /// `[0, 1]`. Renderers pass it to
    /// [`Transform2D::interpolated`](crate::components::transform::Transform2D::interpolated).
    pub fn alpha(&self) -> f32 {
        let st = self.state.lock();
        match st.last_tick_at {
            None => 0.0,
            Some(at) => {
                let period = self.period.as_secs_f32();
                if period <= 0.0 {
                    return 1.0;
                }
                (at.elapsed().as_secs_f32() / period).clamp(0.0, 1.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates_scaled_time() {
        let clock = TickClock::new(Duration::from_millis(100));
        clock.advance();
        clock.set_time_scale(0.5);
        clock.advance();
        let t = clock.now();
        assert_eq!(t.tick, 2);
        assert!((t.elapsed - 0.15).abs() < 1e-5);
        assert!((t.delta - 0.05).abs() < 1e-5);
    }

    #[test]
    fn alpha_is_zero_before_first_tick() {
        let clock = TickClock::new(Duration::from_millis(16));
        assert_eq!(clock.alpha(), 0.0);
    }

    #[test]
    fn alpha_saturates_after_a_full_period() {
        let clock = TickClock::new(Duration::from_millis(1));
        clock.advance();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.alpha(), 1.0);
    }
}
