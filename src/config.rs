//! # Configuration Management
//!
//! Tide settings are read from TOML files. A file may carry a shared `[tide]`
//! section that applies to every region, and per-region
//! `[regions."<name>"]` sections whose keys override the shared ones:
//!
//! ```toml
//! [tide]
//! enabled = true
//! tide_update_rate = 150
//!
//! [regions."Harbor Island"]
//! tide_low_water = 19.5
//! tide_cycle_time = 1800
//! ```
//!
//! A [`ConfigSource`] can chain a fallback file. Region sections missing
//! from the primary file are looked up there, so a simulator host can keep
//! its tide settings out of its main configuration.
//!
//! Defaults are applied after merging, then the result is validated into an
//! immutable [`TideConfig`]. Settings that do not describe a usable tide
//! (inverted range, zero-length cycle, ...) are rejected here rather than
//! producing a strange waveform later.

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Default configuration file consulted by the development driver
pub const DEFAULT_CONFIG_PATH: &str = "region-tide.toml";

/// Validated, immutable tide settings for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct TideConfig {
    /// Low water level in meters
    pub low_tide: f32,
    /// High water level in meters, never below `low_tide`
    pub high_tide: f32,
    /// Seconds for one full high -> low -> high cycle
    pub cycle_seconds: u64,
    /// Host frames between produced ticks
    pub update_every_n_ticks: u32,
    /// Produced ticks a reversal warning stays attached after the reversal tick
    pub announce_tick_count: u32,
    /// Chat channel carrying the multi-line status message
    pub info_channel: i32,
    /// Chat channel carrying the bare water level
    pub level_channel: i32,
    /// Log every sample at info level
    pub debug_logging: bool,
    /// Send chat-style broadcasts at all
    pub broadcast_enabled: bool,
}

impl Default for TideConfig {
    fn default() -> Self {
        TideConfig {
            low_tide: 18.0,
            high_tide: 22.0,
            cycle_seconds: 3600,
            update_every_n_ticks: 150,
            announce_tick_count: 5,
            info_channel: 5555,
            level_channel: 5556,
            debug_logging: false,
            broadcast_enabled: true,
        }
    }
}

/// One configuration section as written in the file.
///
/// Every key is optional so that region sections can override only what
/// they need. Integer keys are read as `i64` so that negative values produce
/// a [`ConfigError`] naming the key instead of a generic parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TideSection {
    pub enabled: Option<bool>,
    pub tide_update_rate: Option<i64>,
    pub tide_low_water: Option<f32>,
    pub tide_high_water: Option<f32>,
    pub tide_cycle_time: Option<i64>,
    pub tide_info_debug: Option<bool>,
    pub tide_info_broadcast: Option<bool>,
    pub tide_info_channel: Option<i32>,
    pub tide_level_channel: Option<i32>,
    pub tide_announce_count: Option<i64>,
}

impl TideSection {
    /// Layer `other` on top of `self`; keys set in `other` win.
    fn overlay(&self, other: &TideSection) -> TideSection {
        TideSection {
            enabled: other.enabled.or(self.enabled),
            tide_update_rate: other.tide_update_rate.or(self.tide_update_rate),
            tide_low_water: other.tide_low_water.or(self.tide_low_water),
            tide_high_water: other.tide_high_water.or(self.tide_high_water),
            tide_cycle_time: other.tide_cycle_time.or(self.tide_cycle_time),
            tide_info_debug: other.tide_info_debug.or(self.tide_info_debug),
            tide_info_broadcast: other.tide_info_broadcast.or(self.tide_info_broadcast),
            tide_info_channel: other.tide_info_channel.or(self.tide_info_channel),
            tide_level_channel: other.tide_level_channel.or(self.tide_level_channel),
            tide_announce_count: other.tide_announce_count.or(self.tide_announce_count),
        }
    }

    /// Apply defaults and validate into a [`TideConfig`].
    pub fn resolve(&self) -> Result<TideConfig, ConfigError> {
        let defaults = TideConfig::default();

        let low_tide = self.tide_low_water.unwrap_or(defaults.low_tide);
        let high_tide = self.tide_high_water.unwrap_or(defaults.high_tide);
        if !low_tide.is_finite() {
            return Err(ConfigError::NonFiniteLevel {
                key: "tide_low_water",
                value: low_tide,
            });
        }
        if !high_tide.is_finite() {
            return Err(ConfigError::NonFiniteLevel {
                key: "tide_high_water",
                value: high_tide,
            });
        }
        if high_tide < low_tide {
            return Err(ConfigError::InvertedRange {
                low: low_tide,
                high: high_tide,
            });
        }

        let cycle = self
            .tide_cycle_time
            .unwrap_or(defaults.cycle_seconds as i64);
        if cycle <= 0 {
            return Err(ConfigError::InvalidCycle(cycle));
        }

        let rate = self
            .tide_update_rate
            .unwrap_or(defaults.update_every_n_ticks as i64);
        let update_every_n_ticks =
            u32::try_from(rate).map_err(|_| ConfigError::InvalidUpdateRate(rate))?;
        if update_every_n_ticks == 0 {
            return Err(ConfigError::InvalidUpdateRate(rate));
        }

        let announce = self
            .tide_announce_count
            .unwrap_or(defaults.announce_tick_count as i64);
        let announce_tick_count =
            u32::try_from(announce).map_err(|_| ConfigError::InvalidAnnounceCount(announce))?;

        Ok(TideConfig {
            low_tide,
            high_tide,
            cycle_seconds: cycle as u64,
            update_every_n_ticks,
            announce_tick_count,
            info_channel: self.tide_info_channel.unwrap_or(defaults.info_channel),
            level_channel: self.tide_level_channel.unwrap_or(defaults.level_channel),
            debug_logging: self.tide_info_debug.unwrap_or(defaults.debug_logging),
            broadcast_enabled: self
                .tide_info_broadcast
                .unwrap_or(defaults.broadcast_enabled),
        })
    }
}

/// Layout of a tide configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Settings shared by every region
    #[serde(default)]
    pub tide: Option<TideSection>,
    /// Per-region overrides keyed by region name
    #[serde(default)]
    pub regions: HashMap<String, TideSection>,
}

/// Outcome of looking up one region's settings.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionSetting {
    /// Neither a shared nor a region section exists
    Missing,
    /// Sections exist but `enabled` is false or unset
    Disabled,
    /// Validated settings ready to drive a simulation
    Enabled(TideConfig),
}

/// Ordered stack of parsed configuration files.
///
/// The first file is the primary configuration; later files are fallbacks
/// consulted only for region sections the earlier ones lack.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    files: Vec<ConfigFile>,
}

impl ConfigSource {
    /// Source with no configuration at all. Every region is disabled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a primary configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let file = toml::from_str::<ConfigFile>(contents)?;
        Ok(ConfigSource { files: vec![file] })
    }

    /// Load a primary configuration file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        let source = Self::parse(&contents)?;
        log::info!("tide: loaded configuration from {}", path.as_ref().display());
        Ok(source)
    }

    /// Chain a fallback file for region sections absent from earlier files.
    ///
    /// A missing fallback file is not an error; a malformed one is.
    pub fn with_fallback_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("tide: no fallback configuration at {}", path.display());
            return Ok(self);
        }
        let contents = fs::read_to_string(path)?;
        self.files.push(toml::from_str::<ConfigFile>(&contents)?);
        Ok(self)
    }

    /// Add an already-parsed fallback layer.
    pub fn with_fallback(mut self, file: ConfigFile) -> Self {
        self.files.push(file);
        self
    }

    /// Resolve the settings for `region`.
    pub fn region(&self, region: &str) -> Result<RegionSetting, ConfigError> {
        let shared = self.files.iter().find_map(|f| f.tide.as_ref());
        let specific = self.files.iter().find_map(|f| f.regions.get(region));

        let merged = match (shared, specific) {
            (None, None) => return Ok(RegionSetting::Missing),
            (Some(shared), None) => shared.clone(),
            (None, Some(specific)) => specific.clone(),
            (Some(shared), Some(specific)) => shared.overlay(specific),
        };

        if !merged.enabled.unwrap_or(false) {
            return Ok(RegionSetting::Disabled);
        }
        merged.resolve().map(RegionSetting::Enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = TideConfig::default();
        assert_eq!(config.low_tide, 18.0);
        assert_eq!(config.high_tide, 22.0);
        assert_eq!(config.cycle_seconds, 3600);
        assert_eq!(config.update_every_n_ticks, 150);
        assert_eq!(config.announce_tick_count, 5);
        assert_eq!(config.info_channel, 5555);
        assert_eq!(config.level_channel, 5556);
        assert!(!config.debug_logging);
        assert!(config.broadcast_enabled);
    }

    #[test]
    fn test_enabled_shared_section_uses_defaults() {
        let source = ConfigSource::parse("[tide]\nenabled = true\n").unwrap();
        assert_eq!(
            source.region("Anywhere").unwrap(),
            RegionSetting::Enabled(TideConfig::default())
        );
    }

    #[test]
    fn test_missing_and_disabled() {
        assert_eq!(
            ConfigSource::empty().region("Anywhere").unwrap(),
            RegionSetting::Missing
        );

        let source = ConfigSource::parse("[tide]\ntide_cycle_time = 60\n").unwrap();
        assert_eq!(source.region("Anywhere").unwrap(), RegionSetting::Disabled);
    }

    #[test]
    fn test_region_section_overrides_shared() {
        let source = ConfigSource::parse(
            r#"
            [tide]
            enabled = true
            tide_cycle_time = 600

            [regions."Harbor Island"]
            tide_low_water = 10.0
            tide_high_water = 12.5

            [regions."Dry Gulch"]
            enabled = false
            "#,
        )
        .unwrap();

        let RegionSetting::Enabled(harbor) = source.region("Harbor Island").unwrap() else {
            panic!("Harbor Island should be enabled");
        };
        assert_eq!(harbor.low_tide, 10.0);
        assert_eq!(harbor.high_tide, 12.5);
        assert_eq!(harbor.cycle_seconds, 600);

        assert_eq!(source.region("Dry Gulch").unwrap(), RegionSetting::Disabled);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let source = ConfigSource::parse(
            "[tide]\nenabled = true\ntide_low_water = 22.0\ntide_high_water = 18.0\n",
        )
        .unwrap();
        assert!(matches!(
            source.region("Anywhere"),
            Err(ConfigError::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_non_positive_integers_rejected() {
        let cases = [
            ("tide_cycle_time = 0", "cycle"),
            ("tide_update_rate = 0", "rate"),
            ("tide_update_rate = -3", "rate"),
            ("tide_announce_count = -1", "announce"),
        ];
        for (line, kind) in cases {
            let source = ConfigSource::parse(&format!("[tide]\nenabled = true\n{line}\n")).unwrap();
            let err = source.region("Anywhere").unwrap_err();
            let ok = match kind {
                "cycle" => matches!(err, ConfigError::InvalidCycle(_)),
                "rate" => matches!(err, ConfigError::InvalidUpdateRate(_)),
                _ => matches!(err, ConfigError::InvalidAnnounceCount(_)),
            };
            assert!(ok, "{line} produced unexpected error {err}");
        }
    }

    #[test]
    fn test_flat_tide_is_valid() {
        let source = ConfigSource::parse(
            "[tide]\nenabled = true\ntide_low_water = 20.0\ntide_high_water = 20.0\n",
        )
        .unwrap();
        assert!(matches!(
            source.region("Anywhere").unwrap(),
            RegionSetting::Enabled(_)
        ));
    }

    #[test]
    fn test_fallback_file_supplies_region_section() {
        let mut fallback = NamedTempFile::new().unwrap();
        writeln!(
            fallback,
            "[regions.\"Far Shore\"]\nenabled = true\ntide_update_rate = 10"
        )
        .unwrap();

        let source = ConfigSource::parse("[regions.\"Near Shore\"]\nenabled = true\n")
            .unwrap()
            .with_fallback_file(fallback.path())
            .unwrap();

        let RegionSetting::Enabled(far) = source.region("Far Shore").unwrap() else {
            panic!("Far Shore should come from the fallback file");
        };
        assert_eq!(far.update_every_n_ticks, 10);
        assert!(matches!(
            source.region("Near Shore").unwrap(),
            RegionSetting::Enabled(_)
        ));
        assert_eq!(source.region("Nowhere").unwrap(), RegionSetting::Missing);
    }

    #[test]
    fn test_missing_fallback_file_is_ignored() {
        let source = ConfigSource::empty()
            .with_fallback_file("/nonexistent/region-tide.toml")
            .unwrap();
        assert_eq!(source.region("Anywhere").unwrap(), RegionSetting::Missing);
    }

    #[test]
    fn test_load_nonexistent_file() {
        assert!(matches!(
            ConfigSource::load_from_path("/nonexistent/path"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(
            ConfigSource::parse("[tide]\nenabled = \"yes please\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
