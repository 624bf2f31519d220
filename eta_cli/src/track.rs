//! `eta track`: config mapping, source assembly and the capture session.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use eta_core::error::EtaError;
use eta_core::stream::{ChannelOutlet, FrameReceiver, stream_info};
use eta_core::{AggregatorCfg, GazeSampleAggregator, ScreenSize, SessionSummary, Tracker, TrackerCfg};
use eta_mock::{MOCK_SERIAL, MockConfig, MockEyeTracker, MockPath};
use eta_traits::{Clock, MonotonicClock};

/// How often the display-side reader drains the live view.
const READER_PERIOD: Duration = Duration::from_millis(250);

/// Command-line overrides applied on top of the loaded config.
#[derive(Debug, Clone, Default)]
pub struct TrackOverrides {
    pub duration: Option<f64>,
    pub use_mock: bool,
    pub fixation: bool,
    pub velocity: Option<f64>,
    pub dont_screen_nans: bool,
    pub save_data: bool,
    pub push_stream: bool,
    pub data_rate: Option<u32>,
    pub data_dir: Option<PathBuf>,
}

impl TrackOverrides {
    /// Flags only ever switch features on; values replace the config's.
    pub fn apply(&self, cfg: &mut eta_config::Config) {
        let t = &mut cfg.tracker;
        if self.duration.is_some() {
            t.duration_s = self.duration;
        }
        t.use_mock |= self.use_mock;
        t.fixation |= self.fixation;
        if let Some(v) = self.velocity {
            t.velocity_threshold = v;
        }
        if self.dont_screen_nans {
            t.screen_nans = false;
        }
        t.save_data |= self.save_data;
        t.push_stream |= self.push_stream;
        if let Some(r) = self.data_rate {
            t.data_rate = r;
        }
        if let Some(dir) = &self.data_dir {
            cfg.output.data_dir.clone_from(dir);
        }
    }
}

fn mock_path(p: eta_config::MockPath) -> MockPath {
    match p {
        eta_config::MockPath::Fixed => MockPath::Fixed,
        eta_config::MockPath::Circle => MockPath::Circle,
        eta_config::MockPath::Grid => MockPath::Grid,
    }
}

fn config_error(e: &eyre::Report) -> eyre::Report {
    eyre::Report::new(EtaError::Config(e.to_string()))
}

/// Build the mock source described by `cfg`. Fails when no device is available.
pub fn make_source(
    cfg: &eta_config::Config,
    clock: Arc<dyn Clock + Send + Sync>,
) -> eyre::Result<MockEyeTracker> {
    if !cfg.tracker.use_mock {
        return Err(eyre::Report::new(EtaError::Config(
            "no tracking device available".into(),
        )));
    }
    let mock = MockEyeTracker::new(MockConfig {
        data_rate: cfg.tracker.data_rate,
        path: mock_path(cfg.mock.path),
        noise: cfg.mock.noise,
        nan_probability: cfg.mock.nan_probability,
        seed: cfg.mock.seed,
        clock,
    })?;
    Ok(mock)
}

/// Display-side consumer: periodically drains the live view and the frame
/// stream, the way a plotting window would.
fn spawn_reader(
    aggregator: GazeSampleAggregator,
    frames: Option<FrameReceiver>,
    stop: Arc<AtomicBool>,
) -> eyre::Result<thread::JoinHandle<u64>> {
    let handle = thread::Builder::new()
        .name("gaze-reader".into())
        .spawn(move || {
            let mut frames_seen: u64 = 0;
            loop {
                let finished = stop.load(Ordering::Acquire);
                let live = aggregator.drain_live();
                let clusters = aggregator.clusters();
                let n_frames = frames.as_ref().map_or(0, |rx| rx.drain().len());
                frames_seen += n_frames as u64;
                if let Some(p) = live.last() {
                    tracing::debug!(
                        live = live.len(),
                        clusters = clusters.len(),
                        frames = n_frames,
                        x = p.x,
                        y = p.y,
                        "gaze view"
                    );
                }
                if finished {
                    break frames_seen;
                }
                thread::sleep(READER_PERIOD);
            }
        })?;
    Ok(handle)
}

pub fn run_track(
    base: &eta_config::Config,
    overrides: &TrackOverrides,
    shutdown: &AtomicBool,
    json: bool,
) -> eyre::Result<SessionSummary> {
    let mut cfg = base.clone();
    overrides.apply(&mut cfg);
    cfg.validate().map_err(|e| config_error(&e))?;

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let source = make_source(&cfg, clock.clone())?;

    let mut builder = Tracker::builder()
        .with_source(source)
        .with_config(TrackerCfg::from(&cfg))
        .with_screen(ScreenSize::from(&cfg.screen))
        .with_aggregator(AggregatorCfg::from(&cfg))
        .with_clock(clock);

    let mut frames = None;
    if cfg.tracker.push_stream {
        let info = stream_info(&cfg.stream.name, cfg.tracker.data_rate, MOCK_SERIAL);
        let (outlet, rx) = ChannelOutlet::bounded(info, cfg.stream.capacity);
        builder = builder.with_outlet(Box::new(outlet));
        frames = Some(rx);
    }
    let mut tracker = builder.build()?;

    let reader_stop = Arc::new(AtomicBool::new(false));
    let reader = spawn_reader(tracker.aggregator(), frames, reader_stop.clone())?;

    let result = tracker.run(shutdown);
    reader_stop.store(true, Ordering::Release);
    let frames_seen = reader.join().unwrap_or_else(|_| {
        tracing::error!("gaze reader thread panicked");
        0
    });
    let summary = result?;

    print_summary(&summary, frames_seen, json);
    Ok(summary)
}

fn print_summary(s: &SessionSummary, frames_seen: u64, json: bool) {
    let elapsed_ms = u64::try_from(s.elapsed.as_millis()).unwrap_or(u64::MAX);
    if json {
        println!(
            "{}",
            serde_json::json!({
                "processed": s.processed,
                "rejected": s.rejected,
                "accepted": s.aggregator.accepted,
                "skipped": s.aggregator.skipped,
                "clusters": s.aggregator.clusters,
                "outlet_errors": s.outlet_errors,
                "frames": frames_seen,
                "saved_to": s.saved_to.as_ref().map(|p| p.display().to_string()),
                "save_error": s.save_error,
                "elapsed_ms": elapsed_ms,
            })
        );
    } else {
        println!(
            "Tracking finished: processed {} samples ({} rejected) in {:.1}s",
            s.processed,
            s.rejected,
            s.elapsed.as_secs_f64()
        );
        println!(
            "Fixation clusters: {}, frames streamed: {}",
            s.aggregator.clusters, frames_seen
        );
        if let Some(p) = &s.saved_to {
            println!("Saved gaze data to {}", p.display());
        }
        if let Some(e) = &s.save_error {
            println!("Gaze data NOT saved: {e}");
        }
    }
}

/// `eta self-check`: build the configured source without starting it.
pub fn self_check(cfg: &eta_config::Config, json: bool) -> eyre::Result<()> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let source = make_source(cfg, clock)?;
    let screen = ScreenSize::from(&cfg.screen);
    let period = source.period();
    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "source": "mock",
                "data_rate": cfg.tracker.data_rate,
                "period_us": u64::try_from(period.as_micros()).unwrap_or(u64::MAX),
                "screen": [screen.width, screen.height],
            })
        );
    } else {
        println!(
            "OK: mock tracker ready at {} Hz, screen {}x{}",
            cfg.tracker.data_rate, screen.width, screen.height
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_switch_features_on() {
        let mut cfg = eta_config::load_toml("[tracker]\nfixation = true\nvelocity_threshold = 2.0").unwrap();
        let o = TrackOverrides {
            velocity: Some(0.9),
            dont_screen_nans: true,
            data_rate: Some(120),
            ..TrackOverrides::default()
        };
        o.apply(&mut cfg);
        assert!(cfg.tracker.fixation);
        assert!(!cfg.tracker.screen_nans);
        assert_eq!(cfg.tracker.velocity_threshold, 0.9);
        assert_eq!(cfg.tracker.data_rate, 120);
        assert_eq!(cfg.tracker.duration_s, None);
    }

    #[test]
    fn no_device_without_mock() {
        let cfg = eta_config::Config::default();
        let err = make_source(&cfg, Arc::new(MonotonicClock::new())).unwrap_err();
        assert!(matches!(err.downcast_ref::<EtaError>(), Some(EtaError::Config(_))));
    }
}
