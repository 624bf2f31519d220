//! Runtime configuration types for the gaze pipeline.
//!
//! These are separate from the TOML-deserialized config in `eta_config`;
//! see `conversions` for the bridge.

use std::path::PathBuf;
use std::time::Duration;

/// Display resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn is_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn as_f64(&self) -> (f64, f64) {
        (f64::from(self.width), f64::from(self.height))
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

/// Parameters of one adaptive (One-Euro) filter channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    /// Cutoff frequency (Hz) when the signal is still.
    pub min_cutoff: f64,
    /// How strongly the cutoff grows with the filtered derivative.
    pub beta: f64,
    /// Cutoff used to smooth the derivative estimate.
    pub derivative_cutoff: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            min_cutoff: 0.004,
            beta: 0.7,
            derivative_cutoff: 1.0,
        }
    }
}

/// Fixation classification settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierCfg {
    pub filter: FilterParams,
    /// Velocity at or below which a sample counts as fixated.
    pub velocity_threshold: f64,
}

impl Default for ClassifierCfg {
    fn default() -> Self {
        Self {
            filter: FilterParams::default(),
            velocity_threshold: 0.5,
        }
    }
}

/// Live buffer and fixation cluster bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorCfg {
    /// Ring buffer capacity (most recent N samples).
    pub live_capacity: usize,
    /// Clusters retained after each cleanup pass.
    pub fixation_history: usize,
    /// Cleanup runs once every this many accepted samples.
    pub cleanup_every: u64,
    /// Keep every record for the persisted log.
    pub save_data: bool,
}

impl Default for AggregatorCfg {
    fn default() -> Self {
        Self {
            live_capacity: 2000,
            fixation_history: 50,
            cleanup_every: 100,
            save_data: false,
        }
    }
}

/// Session-level switches.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerCfg {
    pub data_rate: u32,
    /// Run the fixation classifier on every sample.
    pub fixation: bool,
    pub classifier: ClassifierCfg,
    /// Zero-fill missing values and clamp pixels instead of keeping NaN.
    pub screen_nans: bool,
    pub push_stream: bool,
    pub save_data: bool,
    pub duration: Option<Duration>,
    pub data_dir: PathBuf,
}

impl Default for TrackerCfg {
    fn default() -> Self {
        Self {
            data_rate: 600,
            fixation: false,
            classifier: ClassifierCfg::default(),
            screen_nans: true,
            push_stream: false,
            save_data: false,
            duration: None,
            data_dir: PathBuf::from("data"),
        }
    }
}
