//! Frame decimation.
//!
//! Hosts call into the simulator once per rendered frame, far more often
//! than a tide needs recomputing. [`TickGate`] lets one frame in every `N`
//! through. The counter advances on every poll, fired or skipped, so the
//! period stays exact no matter when the gate was created.

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickGate {
    every: u32,
    frame: u64,
}

impl TickGate {
    /// Gate that fires on frames `0, every, 2 * every, ...`.
    pub fn new(every: u32) -> Result<Self, ConfigError> {
        if every == 0 {
            return Err(ConfigError::InvalidUpdateRate(0));
        }
        Ok(TickGate { every, frame: 0 })
    }

    /// Whether frame index `tick` is one that fires.
    pub fn fires(&self, tick: u64) -> bool {
        tick % u64::from(self.every) == 0
    }

    /// Consume one host frame; true when it should produce a sample.
    pub fn poll(&mut self) -> bool {
        let tick = self.frame;
        self.frame = self.frame.wrapping_add(1);
        self.fires(tick)
    }

    /// Frames seen so far, including skipped ones.
    pub fn frames_seen(&self) -> u64 {
        self.frame
    }
}
