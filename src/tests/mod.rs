//! # Shared Test Fixtures
//!
//! Recording implementations of the host traits, plus the end-to-end tide
//! scenarios in [`scenario_tests`].

use crate::config::ConfigSource;
use crate::error::PublishError;
use crate::publisher::{FrameSource, LevelPublisher};
use crate::RegionId;
use parking_lot::Mutex;


/// Everything a host scene was asked to do, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Recorded {
    Broadcast { channel: i32, message: String },
    WaterHeight(f32),
    TerrainChanged,
}

/// Scene stand-in that remembers every call.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<Recorded>>,
    fail_broadcasts: bool,
}

impl RecordingPublisher {
    /// Publisher whose broadcasts are always rejected.
    pub fn failing_broadcasts() -> Self {
        RecordingPublisher {
            events: Mutex::new(Vec::new()),
            fail_broadcasts: true,
        }
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().clone()
    }

    /// Status messages sent on `channel`.
    pub fn broadcasts_on(&self, channel: i32) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Recorded::Broadcast { channel: c, message } if *c == channel => {
                    Some(message.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl LevelPublisher for RecordingPublisher {
    fn broadcast(&self, channel: i32, message: &str) -> Result<(), PublishError> {
        if self.fail_broadcasts {
            return Err(PublishError::Rejected("chat is muted".to_string()));
        }
        self.events.lock().push(Recorded::Broadcast {
            channel,
            message: message.to_string(),
        });
        Ok(())
    }

    fn set_water_height(&self, level: f32) -> Result<(), PublishError> {
        self.events.lock().push(Recorded::WaterHeight(level));
        Ok(())
    }

    fn notify_terrain_changed(&self) -> Result<(), PublishError> {
        self.events.lock().push(Recorded::TerrainChanged);
        Ok(())
    }
}

/// Frame source stand-in that remembers start/stop requests.
#[derive(Default)]
pub struct RecordingFrames {
    started: Mutex<Vec<RegionId>>,
    stopped: Mutex<Vec<RegionId>>,
}

impl RecordingFrames {
    pub fn started(&self) -> Vec<RegionId> {
        self.started.lock().clone()
    }

    pub fn stopped(&self) -> Vec<RegionId> {
        self.stopped.lock().clone()
    }
}

impl FrameSource for RecordingFrames {
    fn start(&self, region: &RegionId) {
        self.started.lock().push(region.clone());
    }

    fn stop(&self, region: &RegionId) {
        self.stopped.lock().push(region.clone());
    }
}

/// Configuration enabling every region with the default tide.
pub fn enabled_source(update_every: u32) -> ConfigSource {
    ConfigSource::parse(&format!(
        "[tide]\nenabled = true\ntide_update_rate = {update_every}\n"
    ))
    .expect("fixture config parses")
}
