//! # Tide Cycle Model
//!
//! Maps wall-clock time onto a repeating cosine tide.
//!
//! ## Cycle Position
//! [`CycleClock`] folds the current instant into a fraction of the cycle,
//! `[0, 1)`. Time is measured from the Unix epoch, so the phase depends only
//! on the clock and not on the host's frame rate or on when the simulator
//! was started.
//!
//! ## Waveform
//! [`TideWaveform`] turns a position into a water level:
//!
//! ```text
//! level = cos(2π · position) · range + middle
//! ```
//!
//! | position | level  |
//! |----------|--------|
//! | 0.00     | high   |
//! | 0.25     | middle |
//! | 0.50     | low    |
//! | 0.75     | middle |
//!
//! ## Direction
//! The first half of the cycle is reported as `Falling` ("Going Out") and
//! the second half as `Rising` ("Coming In"). The flips therefore land on
//! the extremes themselves, which is when reversal announcements fire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Which way the water is moving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Second half of the cycle, "Coming In"
    Rising,
    /// First half of the cycle, "Going Out"
    Falling,
}

impl Direction {
    /// Direction for a cycle position.
    pub fn at(position: f64) -> Self {
        if position < 0.5 {
            Direction::Falling
        } else {
            Direction::Rising
        }
    }

    /// Label used in status broadcasts.
    pub fn label(self) -> &'static str {
        match self {
            Direction::Rising => "Coming In",
            Direction::Falling => "Going Out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Folds instants into a repeating cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleClock {
    cycle_seconds: u64,
}

impl CycleClock {
    /// `cycle_seconds` must be non-zero; [`crate::config`] guarantees it.
    pub fn new(cycle_seconds: u64) -> Self {
        debug_assert!(cycle_seconds > 0, "cycle length must be positive");
        CycleClock {
            cycle_seconds: cycle_seconds.max(1),
        }
    }

    pub fn cycle_seconds(&self) -> u64 {
        self.cycle_seconds
    }

    /// Fraction of the cycle elapsed at `now`, in `[0, 1)`.
    pub fn position(&self, now: DateTime<Utc>) -> f64 {
        let cycle = (self.cycle_seconds as i128) * MICROS_PER_SECOND as i128;
        let elapsed = (now.timestamp_micros() as i128).rem_euclid(cycle);
        let position = elapsed as f64 / cycle as f64;
        // Guard against rounding up to exactly 1.0 on huge cycles
        if position >= 1.0 {
            0.0
        } else {
            position
        }
    }
}

/// Cosine profile between low and high water.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TideWaveform {
    low: f32,
    high: f32,
}

impl TideWaveform {
    pub fn new(low: f32, high: f32) -> Self {
        TideWaveform { low, high }
    }

    /// Water level in meters at `position`.
    pub fn level(&self, position: f64) -> f32 {
        let radians = position * TAU;
        let range = (f64::from(self.high) - f64::from(self.low)) / 2.0;
        let middle = f64::from(self.low) + range;
        let level = (radians.cos() * range + middle) as f32;
        // f32 rounding can step a hair outside the bounds
        level.clamp(self.low.min(self.high), self.low.max(self.high))
    }
}
