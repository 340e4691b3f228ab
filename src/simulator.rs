//! # Tide Simulator
//!
//! Orchestrates gate, cycle model, reversal tracker and announcement window
//! into one state object per region, and keeps those states keyed by region.
//!
//! ## Lifecycle
//! 1. [`TideSimulator::new`] takes the configuration and the host's
//!    [`FrameSource`].
//! 2. [`TideSimulator::add_region`] reads the region's settings. Enabled
//!    regions get a fresh [`TideState`] and their frames are started.
//! 3. The host calls [`TideSimulator::on_frame`] for each region every frame
//!    (or [`TideSimulator::tick_all`] once per frame for all of them).
//! 4. [`TideSimulator::remove_region`] / [`TideSimulator::shutdown`] stop
//!    frames and drop state.
//!
//! ## Locking
//! The region map has a single lock, held only while inserting, removing or
//! copying out the entries for a tick. Each region's state has its own lock,
//! released before anything is published, so a slow host never blocks region
//! management.

use crate::config::{ConfigSource, RegionSetting, TideConfig};
use crate::cycle::{CycleClock, Direction, TideWaveform};
use crate::error::ConfigError;
use crate::gate::TickGate;
use crate::publisher::{self, FrameSource, LevelPublisher};
use crate::tracker::{AnnounceWindow, DirectionTracker, Extreme};
use crate::{RegionId, TideSample};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Mutable simulation state for one region.
#[derive(Clone, Debug, PartialEq)]
pub struct TideState {
    gate: TickGate,
    clock: CycleClock,
    waveform: TideWaveform,
    tracker: DirectionTracker,
    announce: AnnounceWindow,
    direction: Direction,
}

impl TideState {
    pub fn new(config: &TideConfig) -> Result<Self, ConfigError> {
        Ok(TideState {
            gate: TickGate::new(config.update_every_n_ticks)?,
            clock: CycleClock::new(config.cycle_seconds),
            waveform: TideWaveform::new(config.low_tide, config.high_tide),
            tracker: DirectionTracker::default(),
            announce: AnnounceWindow::new(config.announce_tick_count),
            direction: Direction::Rising,
        })
    }

    /// Advance one host frame. Returns a sample when the gate lets it through.
    pub fn on_tick(&mut self, now: DateTime<Utc>) -> Option<TideSample> {
        if !self.gate.poll() {
            return None;
        }

        let cycle_position = self.clock.position(now);
        let level = self.waveform.level(cycle_position);
        self.direction = Direction::at(cycle_position);

        if let Some(extreme) =
            self.tracker
                .observe(cycle_position, now, self.clock.cycle_seconds())
        {
            self.announce.open(extreme);
        }
        let warning = self.announce.advance();

        Some(TideSample {
            at: now,
            level,
            direction: self.direction,
            low_tide_time: self.tracker.low_tide_time(),
            high_tide_time: self.tracker.high_tide_time(),
            cycle_position,
            warning,
        })
    }

    /// Host frames seen, including gated ones.
    pub fn frames_seen(&self) -> u64 {
        self.gate.frames_seen()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn last_direction(&self) -> Direction {
        self.tracker.last_direction()
    }

    pub fn low_tide_time(&self) -> Option<DateTime<Utc>> {
        self.tracker.low_tide_time()
    }

    pub fn high_tide_time(&self) -> Option<DateTime<Utc>> {
        self.tracker.high_tide_time()
    }

    pub fn announce_message(&self) -> Option<Extreme> {
        self.announce.message()
    }

    pub fn announce_counter(&self) -> u32 {
        self.announce.counter()
    }
}

/// What [`TideSimulator::add_region`] did with a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionStatus {
    /// New region, tide running
    Started,
    /// Region already tracked; publisher swapped, cycle continues
    Replaced,
    /// No usable configuration; the region is not simulated
    Disabled,
}

#[derive(Clone)]
struct RegionEntry {
    config: Arc<TideConfig>,
    state: Arc<Mutex<TideState>>,
    publisher: Arc<dyn LevelPublisher>,
}

/// Tide simulation for any number of independent regions.
pub struct TideSimulator {
    settings: ConfigSource,
    frames: Arc<dyn FrameSource>,
    regions: Mutex<HashMap<RegionId, RegionEntry>>,
}

impl TideSimulator {
    pub fn new(settings: ConfigSource, frames: Arc<dyn FrameSource>) -> Self {
        TideSimulator {
            settings,
            frames,
            regions: Mutex::new(HashMap::new()),
        }
    }

    /// Start simulating `region`, or point an already running region at a
    /// new publisher without disturbing its cycle.
    pub fn add_region(
        &self,
        region: RegionId,
        publisher: Arc<dyn LevelPublisher>,
    ) -> RegionStatus {
        log::info!("tide: adding region {region}");

        {
            let mut regions = self.regions.lock();
            if let Some(entry) = regions.get_mut(&region) {
                entry.publisher = publisher;
                log::info!("tide: {region} already tracked, scene reference replaced");
                return RegionStatus::Replaced;
            }
        }

        let config = match self.settings.region(region.as_str()) {
            Ok(RegionSetting::Enabled(config)) => config,
            Ok(RegionSetting::Missing) => {
                log::info!("tide: no configuration found for {region}, disabled");
                return RegionStatus::Disabled;
            }
            Ok(RegionSetting::Disabled) => {
                log::info!("tide: tide in {region} is set to disabled");
                return RegionStatus::Disabled;
            }
            Err(e) => {
                log::warn!("tide: invalid configuration for {region}, disabled: {e}");
                return RegionStatus::Disabled;
            }
        };
        let state = match TideState::new(&config) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("tide: invalid configuration for {region}, disabled: {e}");
                return RegionStatus::Disabled;
            }
        };

        log::info!(
            "tide: {region} enabled with an update rate every {} frames, low water={}m, high water={}m, cycle time={} secs",
            config.update_every_n_ticks,
            config.low_tide,
            config.high_tide,
            config.cycle_seconds
        );
        log::info!(
            "tide: {region} info channel={}, water level channel={}, info broadcast is {}, announce count={}",
            config.info_channel,
            config.level_channel,
            config.broadcast_enabled,
            config.announce_tick_count
        );

        {
            let mut regions = self.regions.lock();
            // Another caller may have added the region while settings were read
            if let Some(entry) = regions.get_mut(&region) {
                entry.publisher = publisher;
                return RegionStatus::Replaced;
            }
            regions.insert(
                region.clone(),
                RegionEntry {
                    config: Arc::new(config),
                    state: Arc::new(Mutex::new(state)),
                    publisher,
                },
            );
        }

        self.frames.start(&region);
        RegionStatus::Started
    }

    /// Stop simulating `region` and drop its state.
    pub fn remove_region(&self, region: &RegionId) -> bool {
        let removed = self.regions.lock().remove(region).is_some();
        if removed {
            log::info!("tide: removing region {region}");
            self.frames.stop(region);
        }
        removed
    }

    /// Host frame hook for one region.
    ///
    /// Returns the sample that was published, if the frame produced one.
    pub fn on_frame(&self, region: &RegionId, now: DateTime<Utc>) -> Option<TideSample> {
        let entry = self.regions.lock().get(region).cloned()?;
        drive(region, &entry, now)
    }

    /// Drive every tracked region one frame, in region order.
    pub fn tick_all(&self, now: DateTime<Utc>) -> Vec<(RegionId, TideSample)> {
        let mut entries: Vec<(RegionId, RegionEntry)> = self
            .regions
            .lock()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        entries
            .into_iter()
            .filter_map(|(id, entry)| drive(&id, &entry, now).map(|sample| (id, sample)))
            .collect()
    }

    /// Stop every region and drop all state.
    pub fn shutdown(&self) {
        let drained: Vec<RegionId> = self.regions.lock().drain().map(|(id, _)| id).collect();
        for region in &drained {
            self.frames.stop(region);
        }
        log::info!("tide: shut down, {} region(s) stopped", drained.len());
    }

    pub fn is_tracking(&self, region: &RegionId) -> bool {
        self.regions.lock().contains_key(region)
    }

    pub fn region_count(&self) -> usize {
        self.regions.lock().len()
    }

    /// Copy of a region's current state.
    pub fn state(&self, region: &RegionId) -> Option<TideState> {
        let entry = self.regions.lock().get(region).cloned()?;
        let state = entry.state.lock().clone();
        Some(state)
    }

    /// Settings a tracked region is running with.
    pub fn config(&self, region: &RegionId) -> Option<TideConfig> {
        self.regions
            .lock()
            .get(region)
            .map(|entry| entry.config.as_ref().clone())
    }
}

fn drive(region: &RegionId, entry: &RegionEntry, now: DateTime<Utc>) -> Option<TideSample> {
    let sample = entry.state.lock().on_tick(now)?;

    if entry.config.debug_logging {
        log::info!("tide: sea level in {region} currently at {}m", sample.level);
    } else {
        log::debug!(
            "tide: {region} level={}m position={:.4} direction={}",
            sample.level,
            sample.cycle_position,
            sample.direction
        );
    }

    publisher::publish(region, &sample, &entry.config, entry.publisher.as_ref());
    Some(sample)
}
