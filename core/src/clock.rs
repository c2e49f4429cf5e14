//! Simulation clock. Owns time scale, pause, freeze and the
//! fixed-rate timer accumulator.
//!
//! Two clocks share this state:
//!   - the frame clock (variable delta, scaled by `time_scale`)
//!   - the fixed 1 Hz clock, which fires once per simulated second.
//!
//! Both are gated on `paused`, `time_scale == 0` and `frozen`.

use crate::types::{SimSeconds, Tick};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    /// Completed fixed-rate ticks since the scenario started.
    pub current_tick: Tick,
    /// Simulated seconds accumulated by the frame clock.
    pub sim_time: SimSeconds,
    pub time_scale: f64,
    pub paused: bool,
    /// Set by a scenario loss. Only a restart or reset clears it.
    pub frozen: bool,
    /// Simulated time not yet converted into a fixed-rate tick.
    second_accumulator: SimSeconds,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            current_tick: 0,
            sim_time: 0.0,
            time_scale: 1.0,
            paused: true,
            frozen: false,
            second_accumulator: 0.0,
        }
    }

    /// True when neither clock may advance.
    pub fn is_halted(&self) -> bool {
        self.paused || self.frozen || self.time_scale <= 0.0
    }

    /// Convert a real delta into simulated seconds.
    pub fn scaled(&self, real_delta: f64) -> SimSeconds {
        real_delta.max(0.0) * self.time_scale
    }

    /// Move the frame clock forward.
    pub fn advance_time(&mut self, scaled: SimSeconds) {
        self.sim_time += scaled;
    }

    /// Bank simulated time for the fixed-rate timer.
    pub fn bank(&mut self, scaled: SimSeconds) {
        self.second_accumulator += scaled;
    }

    /// Consume one whole simulated second from the accumulator, if
    /// available. Called in a loop by the engine.
    pub fn take_second(&mut self) -> bool {
        if self.second_accumulator >= 1.0 {
            self.second_accumulator -= 1.0;
            true
        } else {
            false
        }
    }

    /// Advance one fixed-rate tick. Returns the new tick number.
    pub fn advance_tick(&mut self) -> Tick {
        self.current_tick += 1;
        self.current_tick
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }
    pub fn freeze(&mut self) { self.frozen = true;  }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_time_scale_fires_more_seconds() {
        let mut clock = SimClock::new();
        clock.resume();
        clock.set_time_scale(3.0);
        let scaled = clock.scaled(1.0);
        clock.bank(scaled);
        let mut fired = 0;
        while clock.take_second() {
            fired += 1;
        }
        assert_eq!(fired, 3);
    }

    #[test]
    fn zero_time_scale_halts() {
        let mut clock = SimClock::new();
        clock.resume();
        clock.set_time_scale(0.0);
        assert!(clock.is_halted());
    }
}
