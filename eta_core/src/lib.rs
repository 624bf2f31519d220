#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Gaze signal conditioning, live aggregation and offline validation.
//!
//! This crate is device-agnostic: samples arrive through
//! `eta_traits::GazeSource` and frames leave through `eta_traits::StreamOutlet`.
//!
//! ## Architecture
//!
//! - **Filtering**: adaptive One-Euro style low-pass per channel (`filter`)
//! - **Classification**: per-eye fixation/saccade state machine (`classifier`)
//! - **Records**: classified samples and their persisted shape (`record`)
//! - **Stream**: 22-channel outbound frame codec and channel outlet (`stream`)
//! - **Aggregation**: bounded live view, fixation clusters, save-mode log (`aggregator`)
//! - **Session**: builder, hot-path pipeline, run/stop/flush (`session`)
//! - **Validation**: two-pass accuracy/precision statistics (`validation`)

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod conversions;
pub mod error;
pub mod filter;
pub mod mocks;
pub mod persist;
pub mod record;
pub mod session;
pub mod stream;
pub mod util;
pub mod validation;

pub use aggregator::{AggregatorStats, FixationCluster, GazeSampleAggregator, LivePoint};
pub use classifier::{EyeClassifier, FixationClassifier, FixationState};
pub use config::{AggregatorCfg, ClassifierCfg, FilterParams, ScreenSize, TrackerCfg};
pub use error::{BuildError, EtaError, Report, Result};
pub use filter::AdaptiveSignalFilter;
pub use record::{EnrichedGazeRecord, EyeRecord};
pub use session::{GazePipeline, SessionSummary, Tracker, TrackerBuilder};
pub use stream::{ChannelOutlet, FrameReceiver, GazeFrame};
pub use validation::{AccuracyStatistic, ValidationAnalyzer, ValidationReport};
