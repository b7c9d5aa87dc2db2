//! Clock and fixed-timestep bookkeeping
//!
//! The simulation advances in uniform `DT` increments while rendering runs
//! once per outer loop iteration. [`FrameTiming`] owns the accumulator that
//! carries unsimulated real time from one iteration to the next.

use std::time::Instant;

/// Monotonic time source reporting seconds since it was created.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    /// Start a new clock at zero
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds elapsed since the clock was created
    pub fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of advancing the frame timer by one outer iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStep {
    /// Clamped wall-clock duration of the iteration, in seconds
    pub frame: f64,
    /// Number of fixed `DT` steps the simulation must run
    pub steps: u32,
}

/// Frame timing state for the fixed/variable timestep split.
///
/// Invariant: after [`FrameTiming::advance`] returns, `accumulator` lies in
/// `[0, DT)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    /// Timestamp of the current iteration
    pub time_now: f64,
    /// Timestamp of the previous iteration
    pub time_prev: f64,
    accumulator: f64,
}

impl FrameTiming {
    /// Fixed simulation step in seconds
    pub const DT: f64 = 1.0 / 120.0;

    /// Upper bound for a single iteration's frame time. Stalls longer than
    /// this (debugger breaks, window drags) are truncated.
    pub const MAX_FRAME: f64 = 0.25;

    /// Create timing anchored at `start` seconds
    pub fn new(start: f64) -> Self {
        Self {
            time_now: start,
            time_prev: start,
            accumulator: 0.0,
        }
    }

    /// Re-anchor the previous timestamp without simulating the gap.
    ///
    /// Used once the engine reaches `Running` so that boot time does not
    /// count as a stall.
    pub fn reset(&mut self, now: f64) {
        self.time_now = now;
        self.time_prev = now;
        self.accumulator = 0.0;
    }

    /// Seconds of real time not yet consumed by fixed steps
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Advance to `now` and drain the accumulator into whole fixed steps.
    pub fn advance(&mut self, now: f64) -> FrameStep {
        self.time_now = now;
        let frame = (now - self.time_prev).clamp(0.0, Self::MAX_FRAME);
        self.time_prev = now;
        self.accumulator += frame;

        let mut steps = 0;
        while self.accumulator >= Self::DT {
            self.accumulator -= Self::DT;
            steps += 1;
        }

        FrameStep { frame, steps }
    }
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(0.0)
    }
}
