//! # Host Publishing
//!
//! The simulator never talks to a scene directly. Hosts implement two
//! collaborator traits:
//!
//! - [`LevelPublisher`]: receives chat-style broadcasts and the new water
//!   height for one region.
//! - [`FrameSource`]: starts and stops delivering per-frame callbacks for a
//!   region. The simulator asks for frames when a region is added and gives
//!   them back on removal or shutdown.
//!
//! ## Message Layout
//! Each produced tick sends two broadcasts when broadcasting is enabled: a
//! multi-line status report on the info channel and the bare level on the
//! level channel. See [`status_message`] for the exact lines.
//!
//! ## Ordering
//! While the tide is coming in the broadcasts go out before the water height
//! changes; while it is going out they follow it. Existing in-world listeners
//! rely on this order.

use crate::config::TideConfig;
use crate::cycle::Direction;
use crate::error::PublishError;
use crate::{RegionId, TideSample};
use chrono::{DateTime, Local, Utc};

/// Receives tide updates for one region's scene.
pub trait LevelPublisher: Send + Sync {
    /// Send `message` to everyone in the region listening on `channel`.
    fn broadcast(&self, channel: i32, message: &str) -> Result<(), PublishError>;

    /// Store the new water height in the region settings.
    fn set_water_height(&self, level: f32) -> Result<(), PublishError>;

    /// Let terrain and water consumers know the height changed.
    fn notify_terrain_changed(&self) -> Result<(), PublishError>;
}

/// Host-side subscription to per-frame callbacks.
pub trait FrameSource: Send + Sync {
    /// Begin calling the simulator's frame hook for `region`.
    fn start(&self, region: &RegionId);

    /// Stop calling the frame hook for `region`.
    fn stop(&self, region: &RegionId);
}

/// Clock time formatted the way the status report shows it.
fn clock_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn predicted(time: Option<DateTime<Utc>>) -> String {
    time.map(clock_time).unwrap_or_else(|| "unknown".to_string())
}

/// Multi-line status report for the info channel.
///
/// ```text
/// Current Server Time: 14:05:09
/// Current Tide Level: 19.87
/// Low Tide Time: 14:30:00
/// Low Tide Level: 18
/// High Tide Time: 15:00:00
/// High Tide Level: 22
/// Tide Direction: Going Out
/// Cycle Position: 0.3
/// Tide Warning: High Tide
/// ```
///
/// The warning line only appears while an announcement window is open.
pub fn status_message(sample: &TideSample, config: &TideConfig) -> String {
    let mut message = format!(
        "Current Server Time: {}\n\
         Current Tide Level: {}\n\
         Low Tide Time: {}\n\
         Low Tide Level: {}\n\
         High Tide Time: {}\n\
         High Tide Level: {}\n\
         Tide Direction: {}\n\
         Cycle Position: {}\n",
        clock_time(sample.at),
        sample.level,
        predicted(sample.low_tide_time),
        config.low_tide,
        predicted(sample.high_tide_time),
        config.high_tide,
        sample.direction,
        sample.cycle_position,
    );
    if let Some(warning) = sample.warning {
        message.push_str(&format!("Tide Warning: {warning}\n"));
    }
    message
}

/// Hand one sample to the region's scene.
///
/// Every step is attempted even if an earlier one failed; failures are
/// logged and not retried. Returns how many steps failed.
pub fn publish(
    region: &RegionId,
    sample: &TideSample,
    config: &TideConfig,
    publisher: &dyn LevelPublisher,
) -> usize {
    let mut failures = 0;

    if config.broadcast_enabled && sample.direction == Direction::Rising {
        failures += send_broadcasts(region, sample, config, publisher);
    }

    if config.debug_logging {
        log::info!("tide: updating region {region}");
    }
    if let Err(e) = publisher.set_water_height(sample.level) {
        log::warn!("tide: {region} rejected water height {}m: {e}", sample.level);
        failures += 1;
    }
    if let Err(e) = publisher.notify_terrain_changed() {
        log::warn!("tide: {region} terrain notification failed: {e}");
        failures += 1;
    }

    if config.broadcast_enabled && sample.direction == Direction::Falling {
        failures += send_broadcasts(region, sample, config, publisher);
    }

    failures
}

fn send_broadcasts(
    region: &RegionId,
    sample: &TideSample,
    config: &TideConfig,
    publisher: &dyn LevelPublisher,
) -> usize {
    let mut failures = 0;
    let status = status_message(sample, config);
    if let Err(e) = publisher.broadcast(config.info_channel, &status) {
        log::warn!(
            "tide: {region} status broadcast on channel {} failed: {e}",
            config.info_channel
        );
        failures += 1;
    }
    if let Err(e) = publisher.broadcast(config.level_channel, &sample.level.to_string()) {
        log::warn!(
            "tide: {region} level broadcast on channel {} failed: {e}",
            config.level_channel
        );
        failures += 1;
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{Recorded, RecordingPublisher};
    use crate::Extreme;
    use chrono::{TimeDelta, TimeZone};

    fn sample(direction: Direction, warning: Option<Extreme>) -> TideSample {
        let at = Utc.timestamp_opt(1_800, 0).unwrap();
        TideSample {
            at,
            level: 18.0,
            direction,
            low_tide_time: Some(at + TimeDelta::seconds(3600)),
            high_tide_time: Some(at + TimeDelta::seconds(1800)),
            cycle_position: 0.5,
            warning,
        }
    }

    #[test]
    fn test_status_message_lines() {
        let config = TideConfig::default();
        let sample = sample(Direction::Rising, Some(Extreme::Low));
        let message = status_message(&sample, &config);
        let lines: Vec<&str> = message.lines().collect();

        assert_eq!(lines.len(), 9);
        assert_eq!(
            lines[0],
            format!("Current Server Time: {}", clock_time(sample.at))
        );
        assert_eq!(lines[1], "Current Tide Level: 18");
        assert_eq!(
            lines[2],
            format!("Low Tide Time: {}", clock_time(sample.at + TimeDelta::seconds(3600)))
        );
        assert_eq!(lines[3], "Low Tide Level: 18");
        assert_eq!(lines[5], "High Tide Level: 22");
        assert_eq!(lines[6], "Tide Direction: Coming In");
        assert_eq!(lines[7], "Cycle Position: 0.5");
        assert_eq!(lines[8], "Tide Warning: Low Tide");
        assert!(message.ends_with('\n'));
    }

    #[test]
    fn test_status_message_without_warning_or_predictions() {
        let config = TideConfig::default();
        let mut sample = sample(Direction::Falling, None);
        sample.low_tide_time = None;
        sample.high_tide_time = None;
        let message = status_message(&sample, &config);

        assert!(!message.contains("Tide Warning"));
        assert!(message.contains("Low Tide Time: unknown\n"));
        assert!(message.contains("High Tide Time: unknown\n"));
        assert!(message.contains("Tide Direction: Going Out\n"));
    }

    #[test]
    fn test_status_message_is_newline_terminated_lines() {
        let config = TideConfig::default();
        let message = status_message(&sample(Direction::Falling, None), &config);

        assert_eq!(message.matches('\n').count(), 8);
        assert!(message.starts_with("Current Server Time: "));
        assert!(message.ends_with("Tide Direction: Going Out\nCycle Position: 0.5\n"));
        assert!(message.lines().all(|line| !line.starts_with(' ')));
    }

    #[test]
    fn test_rising_broadcasts_before_water_update() {
        let config = TideConfig::default();
        let publisher = RecordingPublisher::default();
        let region = RegionId::from("Harbor");

        publish(&region, &sample(Direction::Rising, None), &config, &publisher);

        let events = publisher.events();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], Recorded::Broadcast { channel: 5555, .. }));
        assert_eq!(
            events[1],
            Recorded::Broadcast {
                channel: 5556,
                message: "18".to_string()
            }
        );
        assert_eq!(events[2], Recorded::WaterHeight(18.0));
        assert_eq!(events[3], Recorded::TerrainChanged);
    }

    #[test]
    fn test_falling_broadcasts_after_water_update() {
        let config = TideConfig::default();
        let publisher = RecordingPublisher::default();
        let region = RegionId::from("Harbor");

        publish(&region, &sample(Direction::Falling, None), &config, &publisher);

        let events = publisher.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], Recorded::WaterHeight(18.0));
        assert_eq!(events[1], Recorded::TerrainChanged);
        assert!(matches!(&events[2], Recorded::Broadcast { channel: 5555, .. }));
        assert!(matches!(&events[3], Recorded::Broadcast { channel: 5556, .. }));
    }

    #[test]
    fn test_broadcast_disabled_still_moves_water() {
        let config = TideConfig {
            broadcast_enabled: false,
            ..TideConfig::default()
        };
        let publisher = RecordingPublisher::default();

        publish(
            &RegionId::from("Harbor"),
            &sample(Direction::Rising, None),
            &config,
            &publisher,
        );

        assert_eq!(
            publisher.events(),
            vec![Recorded::WaterHeight(18.0), Recorded::TerrainChanged]
        );
    }

    #[test]
    fn test_failed_step_does_not_stop_the_rest() {
        let config = TideConfig::default();
        let publisher = RecordingPublisher::failing_broadcasts();

        let failures = publish(
            &RegionId::from("Harbor"),
            &sample(Direction::Rising, None),
            &config,
            &publisher,
        );

        assert_eq!(failures, 2);
        assert_eq!(
            publisher.events(),
            vec![Recorded::WaterHeight(18.0), Recorded::TerrainChanged]
        );
    }
}
