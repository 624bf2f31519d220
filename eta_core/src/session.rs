//! Tracking session: wires a `GazeSource` to the classifier, the outbound
//! stream and the aggregator, and owns start/stop/flush.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use eta_traits::clock::{Clock, MonotonicClock};
use eta_traits::{GazeSample, GazeSource, StreamOutlet};

use crate::aggregator::{AggregatorStats, GazeSampleAggregator};
use crate::classifier::{FixationClassifier, FixationState};
use crate::config::{AggregatorCfg, ScreenSize, TrackerCfg};
use crate::error::{BuildError, EtaError, Result};
use crate::persist::session_file_name;
use crate::record::EnrichedGazeRecord;
use crate::stream::encode_frame;

/// Longest the session loop sleeps between stop checks.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct PipelineCounters {
    processed: AtomicU64,
    rejected: AtomicU64,
    outlet_errors: AtomicU64,
}

/// Per-sample hot path: classify, publish, aggregate.
///
/// Runs inside the producer's callback. Work per sample is constant; nothing
/// here blocks on I/O and no lock is held across calls.
pub struct GazePipeline {
    classifier: Option<FixationClassifier>,
    outlet: Option<Box<dyn StreamOutlet>>,
    aggregator: GazeSampleAggregator,
    clock: Arc<dyn Clock + Send + Sync>,
    screen: ScreenSize,
    screen_nans: bool,
    stop: Arc<AtomicBool>,
    counters: Arc<PipelineCounters>,
}

impl GazePipeline {
    pub fn new(
        cfg: &TrackerCfg,
        screen: ScreenSize,
        aggregator: GazeSampleAggregator,
        clock: Arc<dyn Clock + Send + Sync>,
        outlet: Option<Box<dyn StreamOutlet>>,
    ) -> Self {
        let start = clock.unix_secs();
        Self {
            classifier: cfg
                .fixation
                .then(|| FixationClassifier::new(start, &cfg.classifier)),
            outlet: if cfg.push_stream { outlet } else { None },
            aggregator,
            clock,
            screen,
            screen_nans: cfg.screen_nans,
            stop: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(PipelineCounters::default()),
        }
    }

    /// Process one sample. Returns `None` when the sample was rejected or the
    /// pipeline has been stopped; errors never escape to the producer.
    pub fn process(&mut self, sample: &GazeSample) -> Option<EnrichedGazeRecord> {
        if self.stop.load(Ordering::Acquire) {
            return None;
        }

        let (left, right) = match self.classifier.as_mut() {
            Some(c) => match c.classify(sample) {
                Ok(states) => states,
                Err(e) => {
                    let n = self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                    if n == 0 {
                        tracing::warn!(error = %e, "gaze sample rejected");
                    } else {
                        tracing::debug!(error = %e, "gaze sample rejected");
                    }
                    return None;
                }
            },
            None => (FixationState::default(), FixationState::default()),
        };

        let record = EnrichedGazeRecord::new(sample, &left, &right, self.screen, self.screen_nans);

        if let Some(outlet) = self.outlet.as_mut() {
            let frame = encode_frame(&record, self.screen, self.screen_nans, self.clock.unix_secs());
            if let Err(e) = outlet.push(&frame) {
                let n = self.counters.outlet_errors.fetch_add(1, Ordering::Relaxed);
                if n == 0 {
                    tracing::warn!(error = %e, "stream push failed");
                }
            }
        }

        self.aggregator.on_sample(&record);
        self.counters.processed.fetch_add(1, Ordering::Relaxed);
        Some(record)
    }

    /// Flag observed before every sample; once set nothing more is processed.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn aggregator(&self) -> &GazeSampleAggregator {
        &self.aggregator
    }
}

/// Outcome of `Tracker::run`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSummary {
    pub processed: u64,
    pub rejected: u64,
    pub outlet_errors: u64,
    pub aggregator: AggregatorStats,
    pub saved_to: Option<PathBuf>,
    /// Set when the save-mode log could not be written.
    pub save_error: Option<String>,
    pub elapsed: Duration,
}

/// A configured tracking session. Runs once.
pub struct Tracker {
    source: Box<dyn GazeSource>,
    cfg: TrackerCfg,
    screen: ScreenSize,
    aggregator: GazeSampleAggregator,
    clock: Arc<dyn Clock + Send + Sync>,
    outlet: Option<Box<dyn StreamOutlet>>,
    ran: bool,
}

impl core::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracker")
            .field("device", &self.source.info().name)
            .field("cfg", &self.cfg)
            .field("screen", &self.screen)
            .field("ran", &self.ran)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    pub fn builder() -> TrackerBuilder<Missing> {
        TrackerBuilder::default()
    }

    /// Handle for display-side consumers; valid for the whole session.
    pub fn aggregator(&self) -> GazeSampleAggregator {
        self.aggregator.clone()
    }

    pub fn config(&self) -> &TrackerCfg {
        &self.cfg
    }

    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    /// Capture until `shutdown` is set, the configured duration elapses or the
    /// source disconnects. Then unsubscribe, write the save-mode log best-effort
    /// and stop the aggregator.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<SessionSummary> {
        if self.ran {
            return Err(eyre::Report::new(EtaError::State(
                "tracker session already ran".into(),
            )));
        }
        self.ran = true;

        let info = self.source.info();
        tracing::info!(
            address = %info.address,
            model = %info.model,
            name = %info.name,
            serial = %info.serial,
            width = self.screen.width,
            height = self.screen.height,
            rate_hz = self.cfg.data_rate,
            "starting gaze capture"
        );

        let mut pipeline = GazePipeline::new(
            &self.cfg,
            self.screen,
            self.aggregator.clone(),
            self.clock.clone(),
            self.outlet.take(),
        );
        let stop = pipeline.stop_flag();
        let counters = pipeline.counters.clone();

        let started = self.clock.now();
        self.source
            .subscribe(Box::new(move |s: GazeSample| {
                pipeline.process(&s);
            }))
            .map_err(|e| eyre::Report::new(EtaError::Device(e.to_string())))?;

        let deadline = self.cfg.duration;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("shutdown requested");
                break;
            }
            if !self.source.is_connected() {
                tracing::warn!("gaze source disconnected");
                break;
            }
            let elapsed = self.clock.now().saturating_duration_since(started);
            let wait = match deadline {
                Some(d) if elapsed >= d => break,
                Some(d) => POLL_INTERVAL.min(d - elapsed),
                None => POLL_INTERVAL,
            };
            self.clock.sleep(wait);
        }

        stop.store(true, Ordering::Release);
        self.source.unsubscribe();
        let elapsed = self.clock.now().saturating_duration_since(started);

        let mut summary = SessionSummary {
            elapsed,
            ..SessionSummary::default()
        };
        if self.cfg.save_data {
            let path = self.cfg.data_dir.join(session_file_name());
            match self.aggregator.flush_log(&path, self.screen) {
                Ok(_) => summary.saved_to = Some(path),
                Err(e) => {
                    tracing::error!(error = %e, "could not save gaze data");
                    summary.save_error = Some(e.to_string());
                }
            }
        }

        summary.aggregator = self.aggregator.stats();
        summary.processed = counters.processed.load(Ordering::Relaxed);
        summary.rejected = counters.rejected.load(Ordering::Relaxed);
        summary.outlet_errors = counters.outlet_errors.load(Ordering::Relaxed);
        self.aggregator.stop();
        tracing::info!(
            processed = summary.processed,
            rejected = summary.rejected,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "gaze capture finished"
        );
        Ok(summary)
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Tracker`. `build()` exists once a source is set; `try_build()`
/// is always available and reports what is missing.
pub struct TrackerBuilder<S> {
    source: Option<Box<dyn GazeSource>>,
    cfg: Option<TrackerCfg>,
    screen: Option<ScreenSize>,
    aggregator: Option<AggregatorCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    outlet: Option<Box<dyn StreamOutlet>>,
    _s: PhantomData<S>,
}

impl Default for TrackerBuilder<Missing> {
    fn default() -> Self {
        Self {
            source: None,
            cfg: None,
            screen: None,
            aggregator: None,
            clock: None,
            outlet: None,
            _s: PhantomData,
        }
    }
}

impl<S> TrackerBuilder<S> {
    pub fn with_config(mut self, cfg: TrackerCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }
    pub fn with_screen(mut self, screen: ScreenSize) -> Self {
        self.screen = Some(screen);
        self
    }
    pub fn with_aggregator(mut self, cfg: AggregatorCfg) -> Self {
        self.aggregator = Some(cfg);
        self
    }
    /// Defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    /// Outlet used when `push_stream` is enabled.
    pub fn with_outlet(mut self, outlet: Box<dyn StreamOutlet>) -> Self {
        self.outlet = Some(outlet);
        self
    }

    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<Tracker> {
        let source = self
            .source
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSource))?;
        let cfg = self.cfg.unwrap_or_default();
        let screen = self.screen.unwrap_or_default();

        if screen.is_zero_area() {
            return Err(eyre::Report::new(BuildError::ZeroScreen));
        }
        if cfg.data_rate == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "data_rate must be > 0",
            )));
        }
        let threshold = cfg.classifier.velocity_threshold;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "velocity_threshold must be > 0",
            )));
        }
        let f = cfg.classifier.filter;
        if !(f.min_cutoff > 0.0 && f.derivative_cutoff > 0.0 && f.beta >= 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "filter cutoffs must be > 0 and beta >= 0",
            )));
        }
        if cfg.push_stream && self.outlet.is_none() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "push_stream requires an outlet",
            )));
        }

        let aggregator_cfg = AggregatorCfg {
            save_data: cfg.save_data,
            ..self.aggregator.unwrap_or_default()
        };
        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(Tracker {
            source,
            aggregator: GazeSampleAggregator::new(aggregator_cfg, cfg.screen_nans),
            cfg,
            screen,
            clock,
            outlet: self.outlet,
            ran: false,
        })
    }
}

// Setter that advances type-state
impl TrackerBuilder<Missing> {
    pub fn with_source(self, source: impl GazeSource + 'static) -> TrackerBuilder<Set> {
        TrackerBuilder {
            source: Some(Box::new(source)),
            cfg: self.cfg,
            screen: self.screen,
            aggregator: self.aggregator,
            clock: self.clock,
            outlet: self.outlet,
            _s: PhantomData,
        }
    }
}

impl TrackerBuilder<Set> {
    pub fn build(self) -> Result<Tracker> {
        self.try_build()
    }
}
