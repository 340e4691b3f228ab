//! Reversal detection and the announcement window that follows it.

use crate::cycle::Direction;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The extreme the tide has just reached when it reverses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extreme {
    High,
    Low,
}

impl Extreme {
    pub fn label(self) -> &'static str {
        match self {
            Extreme::High => "High Tide",
            Extreme::Low => "Low Tide",
        }
    }
}

impl fmt::Display for Extreme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Remembers the last reported direction and the predicted extreme times.
///
/// A fresh tracker believes the tide is rising, so the first sample taken
/// in the falling half of the cycle counts as a reversal. Predictions stay
/// unset until a reversal has been seen.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionTracker {
    last_direction: Direction,
    low_tide_time: Option<DateTime<Utc>>,
    high_tide_time: Option<DateTime<Utc>>,
}

impl Default for DirectionTracker {
    fn default() -> Self {
        DirectionTracker {
            last_direction: Direction::Rising,
            low_tide_time: None,
            high_tide_time: None,
        }
    }
}

impl DirectionTracker {
    /// Record the direction at `position`, re-predicting extremes on reversal.
    ///
    /// Returns the extreme just reached when the direction changed.
    pub fn observe(
        &mut self,
        position: f64,
        now: DateTime<Utc>,
        cycle_seconds: u64,
    ) -> Option<Extreme> {
        let direction = Direction::at(position);
        if direction == self.last_direction {
            return None;
        }

        let half_cycle = TimeDelta::try_seconds((cycle_seconds / 2) as i64);
        let (extreme, until_next) = match direction {
            Direction::Falling => (Extreme::High, 0.5 - position),
            Direction::Rising => (Extreme::Low, 1.0 - position),
        };
        // Extremes past the end of the calendar stay unknown
        let next = now.checked_add_signed(fraction_of(cycle_seconds, until_next));
        let after = next
            .zip(half_cycle)
            .and_then(|(next, offset)| next.checked_add_signed(offset));
        if after.is_none() {
            log::warn!("tide: a {cycle_seconds}s cycle predicts extremes beyond the calendar");
        }

        match direction {
            Direction::Falling => {
                self.low_tide_time = next;
                self.high_tide_time = after;
            }
            Direction::Rising => {
                self.high_tide_time = next;
                self.low_tide_time = after;
            }
        }
        self.last_direction = direction;
        Some(extreme)
    }

    pub fn last_direction(&self) -> Direction {
        self.last_direction
    }

    pub fn low_tide_time(&self) -> Option<DateTime<Utc>> {
        self.low_tide_time
    }

    pub fn high_tide_time(&self) -> Option<DateTime<Utc>> {
        self.high_tide_time
    }
}

/// `fraction` of a cycle as a duration, to the microsecond.
fn fraction_of(cycle_seconds: u64, fraction: f64) -> TimeDelta {
    TimeDelta::microseconds((cycle_seconds as f64 * fraction * 1_000_000.0).round() as i64)
}

/// Keeps a reversal warning attached for a bounded number of produced ticks.
///
/// The warning shows on the reversal tick and the `limit` ticks after it,
/// then the window closes on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnounceWindow {
    limit: u32,
    counter: u32,
    message: Option<Extreme>,
}

impl AnnounceWindow {
    pub fn new(limit: u32) -> Self {
        AnnounceWindow {
            limit,
            counter: 0,
            message: None,
        }
    }

    /// Start a new window, replacing any open one.
    pub fn open(&mut self, extreme: Extreme) {
        self.counter = 0;
        self.message = Some(extreme);
    }

    /// Warning for the current produced tick, if the window is still open.
    pub fn advance(&mut self) -> Option<Extreme> {
        let message = self.message?;
        if self.counter > self.limit {
            self.counter = 0;
            self.message = None;
            return None;
        }
        self.counter += 1;
        Some(message)
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn message(&self) -> Option<Extreme> {
        self.message
    }
}
