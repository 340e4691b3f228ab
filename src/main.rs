//! # Region Tide Development Driver
//!
//! Runs the tide simulator outside a world server. Regions are driven with
//! an accelerated simulated clock and their broadcasts are printed to
//! stdout, or with `--json` one JSON sample per line.
//!
//! ```text
//! region-tide [--config PATH] [--regions A,B] [--frames N] [--step-secs S] [--json]
//! ```
//!
//! Without a configuration file a built-in demo tide is used.

use anyhow::{bail, Context};
use chrono::{TimeDelta, Utc};
use region_tide::config::DEFAULT_CONFIG_PATH;
use region_tide::{
    ConfigSource, FrameSource, LevelPublisher, PublishError, RegionId, RegionStatus,
    TideSimulator,
};
use std::env;
use std::path::Path;
use std::sync::Arc;

/// Region sections looked up when the main file lacks them
const REGION_FALLBACK_PATH: &str = "region-tide-regions.toml";

/// Demo tide: every frame produces a sample, one-hour cycle
const DEMO_CONFIG: &str = r#"
[tide]
enabled = true
tide_update_rate = 1
tide_announce_count = 2
"#;

/// Prints everything a scene would receive.
struct ConsoleScene {
    region: RegionId,
    quiet: bool,
}

impl LevelPublisher for ConsoleScene {
    fn broadcast(&self, channel: i32, message: &str) -> Result<(), PublishError> {
        if !self.quiet {
            println!("[{} ch {}]\n{}", self.region, channel, message.trim_end());
        }
        Ok(())
    }

    fn set_water_height(&self, level: f32) -> Result<(), PublishError> {
        log::debug!("{}: water height -> {}m", self.region, level);
        Ok(())
    }

    fn notify_terrain_changed(&self) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Frames come from the loop in `main`, so start/stop are only logged.
struct DriverFrames;

impl FrameSource for DriverFrames {
    fn start(&self, region: &RegionId) {
        log::info!("frames started for {region}");
    }

    fn stop(&self, region: &RegionId) {
        log::info!("frames stopped for {region}");
    }
}

struct Options {
    config: Option<String>,
    regions: Vec<RegionId>,
    frames: u64,
    step_secs: i64,
    json: bool,
}

fn parse_args() -> anyhow::Result<Options> {
    let mut options = Options {
        config: None,
        regions: vec![RegionId::from("Demo Region")],
        frames: 24,
        step_secs: 300,
        json: false,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => options.config = Some(args.next().context("--config needs a path")?),
            "--regions" => {
                let list = args.next().context("--regions needs a comma separated list")?;
                options.regions = list
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(RegionId::from)
                    .collect();
            }
            "--frames" => {
                options.frames = args
                    .next()
                    .context("--frames needs a count")?
                    .parse()
                    .context("--frames must be a whole number")?;
            }
            "--step-secs" => {
                options.step_secs = args
                    .next()
                    .context("--step-secs needs a number of seconds")?
                    .parse()
                    .context("--step-secs must be a whole number")?;
            }
            "--json" => options.json = true,
            other => bail!("unknown argument {other}"),
        }
    }

    if options.regions.is_empty() {
        bail!("no regions to simulate");
    }
    Ok(options)
}

fn load_settings(path: Option<&str>) -> anyhow::Result<ConfigSource> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    let source = if Path::new(path).exists() {
        ConfigSource::load_from_path(path).with_context(|| format!("loading {path}"))?
    } else {
        log::info!("no config file at {path}, using the demo tide");
        ConfigSource::parse(DEMO_CONFIG)?
    };
    source
        .with_fallback_file(REGION_FALLBACK_PATH)
        .with_context(|| format!("loading {REGION_FALLBACK_PATH}"))
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let options = parse_args()?;
    let settings = load_settings(options.config.as_deref())?;
    let simulator = TideSimulator::new(settings, Arc::new(DriverFrames));

    for region in &options.regions {
        let scene = Arc::new(ConsoleScene {
            region: region.clone(),
            quiet: options.json,
        });
        if simulator.add_region(region.clone(), scene) == RegionStatus::Disabled {
            eprintln!("Tide is disabled for {region}");
        }
    }
    if simulator.region_count() == 0 {
        bail!("no region has tide enabled");
    }

    let start = Utc::now();
    for frame in 0..options.frames {
        let now = start + TimeDelta::seconds(options.step_secs * frame as i64);
        for (region, sample) in simulator.tick_all(now) {
            if options.json {
                let line = serde_json::json!({ "region": region, "sample": sample });
                println!("{line}");
            }
        }
    }

    simulator.shutdown();
    Ok(())
}
