//! Tick-driven countdowns used in place of delayed continuations.

use fastrand::Rng;
use serde::{Deserialize, Serialize};

/// A countdown advanced once per simulation tick.
///
/// An idle countdown reports neither running nor just-finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: f32,
    running: bool,
}

impl Countdown {
    /// Creates an idle countdown.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            remaining: 0.0,
            running: false,
        }
    }

    /// Starts (or restarts) the countdown.
    pub fn start(&mut self, seconds: f32) {
        self.remaining = seconds.max(0.0);
        self.running = true;
    }

    /// Starts with a duration drawn uniformly from `[min, max]`.
    pub fn start_random(&mut self, min: f32, max: f32, rng: &mut Rng) {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.start(lo + (hi - lo) * rng.f32());
    }

    /// Stops without firing.
    pub fn cancel(&mut self) {
        self.remaining = 0.0;
        self.running = false;
    }

    /// Advances by `dt`. Returns true on the tick the countdown expires.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.running = false;
            return true;
        }
        false
    }

    /// Whether the countdown is in progress.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Seconds left; zero when idle.
    #[must_use]
    pub const fn remaining(&self) -> f32 {
        self.remaining
    }
}
