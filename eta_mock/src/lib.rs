#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Synthetic eye tracker for development without hardware.
//!
//! `MockEyeTracker` implements `eta_traits::GazeSource`: subscribing starts one
//! background thread that emits a sample every `0.99 / data_rate` seconds along
//! a scripted path. Unsubscribing (or dropping the tracker) stops and joins it.

pub mod error;
pub mod generator;
pub mod path;
pub mod util;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use eta_traits::{BoxError, Clock, DeviceInfo, GazeHandler, GazeSource, MonotonicClock};

pub use error::DeviceError;
pub use generator::GazeGenerator;
pub use path::MockPath;

/// Serial reported by every mock device.
pub const MOCK_SERIAL: &str = "ZA03046BINAY2024";

#[derive(Clone)]
pub struct MockConfig {
    pub data_rate: u32,
    pub path: MockPath,
    pub noise: f64,
    pub nan_probability: f64,
    /// Fixed seed for repeatable runs; entropy when `None`.
    pub seed: Option<u64>,
    pub clock: Arc<dyn Clock + Send + Sync>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            data_rate: 600,
            path: MockPath::default(),
            noise: 0.002,
            nan_probability: 0.0,
            seed: None,
            clock: Arc::new(MonotonicClock::new()),
        }
    }
}

impl core::fmt::Debug for MockConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MockConfig")
            .field("data_rate", &self.data_rate)
            .field("path", &self.path)
            .field("noise", &self.noise)
            .field("nan_probability", &self.nan_probability)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct MockEyeTracker {
    cfg: MockConfig,
    period: Duration,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MockEyeTracker {
    /// Validate `cfg`; nothing runs until `subscribe`.
    pub fn new(cfg: MockConfig) -> error::Result<Self> {
        let period = util::sample_period(cfg.data_rate)?;
        // surface parameter errors now rather than on the worker thread
        GazeGenerator::new(cfg.path, cfg.noise, cfg.nan_probability, cfg.seed)?;
        Ok(Self {
            cfg,
            period,
            stop: Arc::new(AtomicBool::new(true)),
            worker: None,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some() && !self.stop.load(Ordering::Acquire)
    }

    fn start(&mut self, mut handler: GazeHandler) -> error::Result<()> {
        let mut generator =
            GazeGenerator::new(self.cfg.path, self.cfg.noise, self.cfg.nan_probability, self.cfg.seed)?;
        let stop = Arc::new(AtomicBool::new(false));
        let stop_bg = stop.clone();
        let clock = self.cfg.clock.clone();
        let period = self.period;

        let handle = thread::Builder::new()
            .name("mock-eye-tracker".into())
            .spawn(move || {
                let mut emitted: u64 = 0;
                while !stop_bg.load(Ordering::Acquire) {
                    clock.sleep(period);
                    if stop_bg.load(Ordering::Acquire) {
                        break;
                    }
                    handler(generator.sample_at(clock.unix_secs()));
                    emitted += 1;
                }
                tracing::debug!(emitted, "mock tracker thread exiting");
            })?;

        self.stop = stop;
        self.worker = Some(handle);
        tracing::info!(
            rate_hz = self.cfg.data_rate,
            path = ?self.cfg.path,
            noise = self.cfg.noise,
            "mock tracker started"
        );
        Ok(())
    }
}

impl GazeSource for MockEyeTracker {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            address: MOCK_SERIAL.into(),
            model: MOCK_SERIAL.into(),
            name: "Mock Tracker".into(),
            serial: MOCK_SERIAL.into(),
        }
    }

    fn subscribe(&mut self, handler: GazeHandler) -> Result<(), BoxError> {
        // one handler at a time: replace any running worker
        self.unsubscribe();
        self.start(handler).map_err(|e| Box::new(e) as BoxError)
    }

    fn unsubscribe(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("mock tracker thread panicked");
            } else {
                tracing::info!("mock tracker stopped");
            }
        }
    }
}

impl Drop for MockEyeTracker {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
