//! `From` implementations bridging `eta_config` types to `eta_core` types.

use std::time::Duration;

use crate::config::{AggregatorCfg, ClassifierCfg, FilterParams, ScreenSize, TrackerCfg};

// ── FilterParams ─────────────────────────────────────────────────────────────

impl From<&eta_config::FilterCfg> for FilterParams {
    fn from(c: &eta_config::FilterCfg) -> Self {
        Self {
            min_cutoff: c.min_cutoff,
            beta: c.beta,
            derivative_cutoff: c.derivative_cutoff,
        }
    }
}

// ── ScreenSize ───────────────────────────────────────────────────────────────

impl From<&eta_config::ScreenCfg> for ScreenSize {
    fn from(c: &eta_config::ScreenCfg) -> Self {
        Self::new(c.width, c.height)
    }
}

// ── AggregatorCfg ────────────────────────────────────────────────────────────

impl From<&eta_config::Config> for AggregatorCfg {
    fn from(c: &eta_config::Config) -> Self {
        Self {
            live_capacity: c.aggregator.live_capacity,
            fixation_history: c.aggregator.fixation_history,
            cleanup_every: c.aggregator.cleanup_every,
            save_data: c.tracker.save_data,
        }
    }
}

// ── TrackerCfg ───────────────────────────────────────────────────────────────

impl From<&eta_config::Config> for TrackerCfg {
    fn from(c: &eta_config::Config) -> Self {
        Self {
            data_rate: c.tracker.data_rate,
            fixation: c.tracker.fixation,
            classifier: ClassifierCfg {
                filter: FilterParams::from(&c.filter),
                velocity_threshold: c.tracker.velocity_threshold,
            },
            screen_nans: c.tracker.screen_nans,
            push_stream: c.tracker.push_stream,
            save_data: c.tracker.save_data,
            duration: c
                .tracker
                .duration_s
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(Duration::from_secs_f64),
            data_dir: c.output.data_dir.clone(),
        }
    }
}
