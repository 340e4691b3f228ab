//! # Region Tide Core Library
//!
//! This library simulates a periodic tide for virtual-world regions. A host
//! simulator calls into it once per frame; every so often the tide is
//! recomputed from the wall clock and the new water level is handed back to
//! the host's scene together with chat-style status broadcasts.
//!
//! ## Design Philosophy
//!
//! ### Wall-Clock Phase
//! The tide position is derived from the current time, not from the number
//! of frames seen. Frame rate hiccups or a host restart do not shift the
//! phase; two regions with the same cycle length are at the same level at
//! the same moment.
//!
//! ### One State Per Region
//! All mutable simulation data lives in a [`simulator::TideState`] owned by
//! the [`TideSimulator`] entry for its region. Regions never share state,
//! even when one simulator serves many of them.
//!
//! ### Host At Arm's Length
//! The simulator is only ever called. It reaches the host through two traits,
//! [`LevelPublisher`] for output and [`FrameSource`] for frame subscription,
//! so it can be driven from tests or a development driver as easily as from
//! a real world server.
//!
//! ## Data Flow
//! 1. **Gate**: [`gate::TickGate`] drops all but one of every N frames
//! 2. **Cycle**: [`cycle::CycleClock`] folds the time into a cycle position
//! 3. **Level**: [`cycle::TideWaveform`] turns the position into meters
//! 4. **Reversal**: [`tracker::DirectionTracker`] predicts the next extremes
//! 5. **Warning**: [`tracker::AnnounceWindow`] keeps "High/Low Tide" visible
//! 6. **Publish**: [`publisher::publish`] broadcasts and moves the water
//!
//! ## Core Types
//! - [`RegionId`]: name of a simulated region
//! - [`TideSample`]: one produced tide reading

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// Module declarations
pub mod config;
pub mod cycle;
pub mod error;
pub mod gate;
pub mod publisher;
pub mod simulator;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use config::{ConfigSource, RegionSetting, TideConfig};
pub use cycle::Direction;
pub use error::{ConfigError, PublishError};
pub use publisher::{FrameSource, LevelPublisher};
pub use simulator::{RegionStatus, TideSimulator, TideState};
pub use tracker::Extreme;

/// Name of a region driven by the simulator.
///
/// # Example
/// ```
/// use region_tide::RegionId;
///
/// let region = RegionId::from("Harbor Island");
/// assert_eq!(region.as_str(), "Harbor Island");
/// assert_eq!(region.to_string(), "Harbor Island");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(name: impl Into<String>) -> Self {
        RegionId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RegionId {
    fn from(name: &str) -> Self {
        RegionId(name.to_string())
    }
}

impl From<String> for RegionId {
    fn from(name: String) -> Self {
        RegionId(name)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One produced tide reading.
///
/// Samples are produced only on frames that pass the update gate and are
/// handed to the region's publisher once.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use region_tide::{Direction, TideConfig, TideState};
///
/// let config = TideConfig { update_every_n_ticks: 1, ..TideConfig::default() };
/// let mut state = TideState::new(&config).unwrap();
///
/// let sample = state.on_tick(Utc.timestamp_opt(0, 0).unwrap()).unwrap();
/// assert!((sample.level - 22.0).abs() < 1e-4);
/// assert_eq!(sample.direction, Direction::Falling);
/// assert_eq!(sample.warning.map(|w| w.to_string()), Some("High Tide".to_string()));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TideSample {
    /// Instant the sample was computed for
    pub at: DateTime<Utc>,
    /// Water level in meters
    pub level: f32,
    /// Direction reported for this cycle position
    pub direction: Direction,
    /// Predicted next low tide; unknown until the first reversal
    pub low_tide_time: Option<DateTime<Utc>>,
    /// Predicted next high tide; unknown until the first reversal
    pub high_tide_time: Option<DateTime<Utc>>,
    /// Fraction of the cycle elapsed, `[0, 1)`
    pub cycle_position: f64,
    /// Reversal warning while the announcement window is open
    pub warning: Option<Extreme>,
}
