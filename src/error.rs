//! # Error Types
//!
//! Two failure domains exist in the simulator:
//! - **Configuration**: a region's settings could not be read or do not
//!   describe a usable tide. The region is left disabled.
//! - **Publishing**: the host rejected a broadcast or water-height update.
//!   The tick's sample is simply not observed; the next gated tick retries
//!   with fresh data.
//!
//! Nothing that happens inside a tick can fail on its own, so there is no
//! error type for the cycle arithmetic.

use std::io;
use thiserror::Error;

/// Errors raised while loading or validating tide configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("config IO: {0}")]
    Io(#[from] io::Error),

    /// Configuration file is not valid TOML or has mistyped keys
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),

    /// High water sits below low water
    #[error("tide_high_water ({high}m) is below tide_low_water ({low}m)")]
    InvertedRange { low: f32, high: f32 },

    /// Water level bound is NaN or infinite
    #[error("{key} must be a finite number of meters, got {value}")]
    NonFiniteLevel { key: &'static str, value: f32 },

    /// Cycle must last at least one second
    #[error("tide_cycle_time must be a positive number of seconds, got {0}")]
    InvalidCycle(i64),

    /// Gate must let at least one of every N frames through
    #[error("tide_update_rate must be at least 1 frame, got {0}")]
    InvalidUpdateRate(i64),

    /// Warning window cannot be negative
    #[error("tide_announce_count must not be negative, got {0}")]
    InvalidAnnounceCount(i64),
}

/// Errors reported by the host while receiving a tide update.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The region's scene is gone or no longer accepting updates
    #[error("region scene unavailable")]
    Unavailable,

    /// The host refused the update for its own reasons
    #[error("host rejected update: {0}")]
    Rejected(String),
}
