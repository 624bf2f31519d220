#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the gaze tracking tools.
//!
//! Every section is optional in the TOML; missing fields fall back to the
//! `Default` impls below. Call `Config::validate()` after loading.
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrackerCfg {
    /// Producer sample rate in Hz
    pub data_rate: u32,
    pub use_mock: bool,
    /// Enable fixation classification
    pub fixation: bool,
    /// Filter-disagreement velocity at or below which an eye counts as fixated
    pub velocity_threshold: f64,
    /// true: missing points are zero-filled and pixels clamped; false: missing stays NaN
    pub screen_nans: bool,
    pub push_stream: bool,
    pub save_data: bool,
    /// Fixed session length in seconds; absent runs until interrupted
    pub duration_s: Option<f64>,
}

impl Default for TrackerCfg {
    fn default() -> Self {
        Self {
            data_rate: 600,
            use_mock: false,
            fixation: false,
            velocity_threshold: 1.5,
            screen_nans: true,
            push_stream: false,
            save_data: false,
            duration_s: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ScreenCfg {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenCfg {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct FilterCfg {
    pub min_cutoff: f64,
    pub beta: f64,
    pub derivative_cutoff: f64,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            min_cutoff: 0.004,
            beta: 0.7,
            derivative_cutoff: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct AggregatorCfg {
    /// Live ring buffer size (most recent samples kept)
    pub live_capacity: usize,
    /// Max fixation clusters retained after a cleanup pass
    pub fixation_history: usize,
    /// Run cluster cleanup once every this many samples
    pub cleanup_every: u64,
}

impl Default for AggregatorCfg {
    fn default() -> Self {
        Self {
            live_capacity: 2000,
            fixation_history: 50,
            cleanup_every: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MockPath {
    /// Hold still at the screen centre
    Fixed,
    /// Sweep a circle around the centre
    #[default]
    Circle,
    /// Dwell on the cells of a 3x3 grid in turn
    Grid,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MockCfg {
    pub path: MockPath,
    /// Uniform jitter amplitude in normalized units
    pub noise: f64,
    /// Per-eye probability that a sample carries no gaze point
    pub nan_probability: f64,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for MockCfg {
    fn default() -> Self {
        Self {
            path: MockPath::Circle,
            noise: 0.002,
            nan_probability: 0.0,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StreamCfg {
    pub name: String,
    /// Bounded outbound queue length; frames are dropped when full
    pub capacity: usize,
}

impl Default for StreamCfg {
    fn default() -> Self {
        Self {
            name: "tobii_gaze_fixation".to_string(),
            capacity: 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputCfg {
    pub data_dir: PathBuf,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerCfg,
    pub screen: ScreenCfg,
    pub filter: FilterCfg,
    pub aggregator: AggregatorCfg,
    pub mock: MockCfg,
    pub stream: StreamCfg,
    pub output: OutputCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Tracker
        if self.tracker.data_rate == 0 {
            eyre::bail!("tracker.data_rate must be > 0");
        }
        if self.tracker.data_rate > 2000 {
            eyre::bail!("tracker.data_rate is unreasonably large (>2000 Hz)");
        }
        if !(self.tracker.velocity_threshold.is_finite() && self.tracker.velocity_threshold > 0.0) {
            eyre::bail!("tracker.velocity_threshold must be a finite value > 0");
        }
        if let Some(d) = self.tracker.duration_s
            && !(d.is_finite() && d > 0.0)
        {
            eyre::bail!("tracker.duration_s must be > 0 when set");
        }

        // Screen
        if self.screen.width == 0 || self.screen.height == 0 {
            eyre::bail!("screen.width and screen.height must be > 0");
        }

        // Filter
        if !(self.filter.min_cutoff.is_finite() && self.filter.min_cutoff > 0.0) {
            eyre::bail!("filter.min_cutoff must be > 0");
        }
        if !(self.filter.beta.is_finite() && self.filter.beta >= 0.0) {
            eyre::bail!("filter.beta must be >= 0");
        }
        if !(self.filter.derivative_cutoff.is_finite() && self.filter.derivative_cutoff > 0.0) {
            eyre::bail!("filter.derivative_cutoff must be > 0");
        }

        // Aggregator
        if self.aggregator.live_capacity == 0 {
            eyre::bail!("aggregator.live_capacity must be >= 1");
        }
        if self.aggregator.live_capacity > 1_000_000 {
            eyre::bail!("aggregator.live_capacity is unreasonably large (>1000000)");
        }
        if self.aggregator.fixation_history == 0 {
            eyre::bail!("aggregator.fixation_history must be >= 1");
        }
        if self.aggregator.cleanup_every == 0 {
            eyre::bail!("aggregator.cleanup_every must be >= 1");
        }

        // Mock
        if !(self.mock.noise.is_finite() && self.mock.noise >= 0.0) {
            eyre::bail!("mock.noise must be >= 0");
        }
        if !(0.0..=1.0).contains(&self.mock.nan_probability) {
            eyre::bail!("mock.nan_probability must be in [0.0, 1.0]");
        }

        // Stream
        if self.stream.name.trim().is_empty() {
            eyre::bail!("stream.name must not be empty");
        }
        if self.stream.capacity == 0 {
            eyre::bail!("stream.capacity must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
