use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eta_core::error::BuildError;
use eta_core::mocks::{RecordingOutlet, ReplaySource, UnavailableSource};
use eta_core::persist::load_gaze_log;
use eta_core::stream::{CHANNEL_COUNT, stream_info};
use eta_core::{
    AggregatorCfg, ClassifierCfg, EtaError, GazePipeline, GazeSampleAggregator, ScreenSize, Tracker,
    TrackerCfg,
};
use eta_traits::{
    BoxError, DeviceInfo, GazeHandler, GazeSample, GazeSource, ManualClock, StreamOutlet,
};
use rstest::rstest;
use tempfile::tempdir;

const DT: f64 = 1.0 / 600.0;

fn steady_samples(n: usize) -> Vec<GazeSample> {
    (0..n)
        .map(|i| GazeSample::binocular(0.01 + DT * i as f64, 0.5, 0.5))
        .collect()
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::starting_at(0.0))
}

fn fixation_cfg() -> TrackerCfg {
    TrackerCfg {
        fixation: true,
        classifier: ClassifierCfg {
            velocity_threshold: 1.5,
            ..ClassifierCfg::default()
        },
        ..TrackerCfg::default()
    }
}

/// Connected source that never delivers; records unsubscribe.
struct IdleSource {
    unsubscribed: Arc<AtomicBool>,
}

impl GazeSource for IdleSource {
    fn info(&self) -> DeviceInfo {
        DeviceInfo::default()
    }
    fn subscribe(&mut self, _handler: GazeHandler) -> Result<(), BoxError> {
        Ok(())
    }
    fn unsubscribe(&mut self) {
        self.unsubscribed.store(true, Ordering::SeqCst);
    }
}

#[rstest]
fn missing_source_is_typed_build_error() {
    let err = Tracker::builder()
        .with_config(TrackerCfg::default())
        .try_build()
        .expect_err("should fail with MissingSource");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingSource) => {}
        other => panic!("expected MissingSource, got: {other:?}"),
    }
}

#[rstest]
#[case::zero_width(ScreenSize::new(0, 1080))]
#[case::zero_height(ScreenSize::new(1920, 0))]
fn zero_area_screen_is_rejected(#[case] screen: ScreenSize) {
    let err = Tracker::builder()
        .with_source(ReplaySource::new(Vec::new()))
        .with_screen(screen)
        .build()
        .expect_err("zero-area screen");
    assert!(matches!(err.downcast_ref::<BuildError>(), Some(BuildError::ZeroScreen)));
}

#[rstest]
#[case::zero_rate(TrackerCfg { data_rate: 0, ..TrackerCfg::default() })]
#[case::zero_threshold(TrackerCfg {
    classifier: ClassifierCfg { velocity_threshold: 0.0, ..ClassifierCfg::default() },
    ..TrackerCfg::default()
})]
#[case::stream_without_outlet(TrackerCfg { push_stream: true, ..TrackerCfg::default() })]
fn invalid_session_config_is_rejected(#[case] cfg: TrackerCfg) {
    let err = Tracker::builder()
        .with_source(ReplaySource::new(Vec::new()))
        .with_config(cfg)
        .build()
        .expect_err("invalid config");
    assert!(matches!(err.downcast_ref::<BuildError>(), Some(BuildError::InvalidConfig(_))));
}

#[test]
fn replay_session_processes_and_saves_every_sample() {
    let dir = tempdir().unwrap();
    let cfg = TrackerCfg {
        save_data: true,
        data_dir: dir.path().join("sessions"),
        ..fixation_cfg()
    };
    let mut tracker = Tracker::builder()
        .with_source(ReplaySource::new(steady_samples(1800)))
        .with_config(cfg)
        .with_clock(clock())
        .build()
        .unwrap();

    let summary = tracker.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(summary.processed, 1800);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.aggregator.accepted, 1800);
    assert!(summary.aggregator.clusters >= 1, "steady gaze must form a fixation cluster");
    assert!(summary.save_error.is_none());

    let path = summary.saved_to.expect("save-mode log written");
    assert!(path.starts_with(dir.path().join("sessions")));
    let log = load_gaze_log(&path).unwrap();
    assert_eq!(log.screen_size, [1920.0, 1080.0]);
    assert_eq!(log.data.len(), 1800);
    assert!(log.data.last().unwrap().left_eye.fixated);

    // live view is released once the session stops
    assert!(tracker.aggregator().is_stopped());
    assert!(tracker.aggregator().snapshot().is_empty());
}

#[test]
fn non_advancing_timestamps_are_rejected_not_fatal() {
    let samples = vec![
        GazeSample::binocular(0.01, 0.5, 0.5),
        GazeSample::binocular(0.01, 0.5, 0.5),
        GazeSample::binocular(0.005, 0.5, 0.5),
        GazeSample::binocular(0.02, 0.5, 0.5),
    ];
    let mut tracker = Tracker::builder()
        .with_source(ReplaySource::new(samples))
        .with_config(fixation_cfg())
        .with_clock(clock())
        .build()
        .unwrap();
    let summary = tracker.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.rejected, 2);
    assert!(summary.saved_to.is_none());
}

#[test]
fn stream_receives_one_full_width_frame_per_sample() {
    let outlet = RecordingOutlet::new(stream_info("tobii_gaze_fixation", 600, "TEST"));
    let cfg = TrackerCfg {
        push_stream: true,
        ..fixation_cfg()
    };
    let mut tracker = Tracker::builder()
        .with_source(ReplaySource::new(steady_samples(10)))
        .with_config(cfg)
        .with_screen(ScreenSize::new(1280, 720))
        .with_outlet(Box::new(outlet.clone()))
        .with_clock(clock())
        .build()
        .unwrap();
    let summary = tracker.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(summary.outlet_errors, 0);

    let frames = outlet.frames();
    assert_eq!(frames.len(), 10);
    for (i, f) in frames.iter().enumerate() {
        assert_eq!(f.len(), CHANNEL_COUNT);
        assert_eq!(f[18], 1280.0);
        assert_eq!(f[19], 720.0);
        assert_eq!(f[20], 0.01 + DT * i as f64);
    }
}

#[test]
fn a_tracker_runs_only_once() {
    let mut tracker = Tracker::builder()
        .with_source(ReplaySource::new(steady_samples(3)))
        .with_clock(clock())
        .build()
        .unwrap();
    tracker.run(&AtomicBool::new(false)).unwrap();
    let err = tracker.run(&AtomicBool::new(false)).unwrap_err();
    assert!(matches!(err.downcast_ref::<EtaError>(), Some(EtaError::State(_))));
}

#[test]
fn subscribe_failure_is_device_error() {
    let mut tracker = Tracker::builder()
        .with_source(UnavailableSource)
        .with_clock(clock())
        .build()
        .unwrap();
    let err = tracker.run(&AtomicBool::new(false)).unwrap_err();
    assert!(matches!(err.downcast_ref::<EtaError>(), Some(EtaError::Device(_))));
}

#[test]
fn duration_bounds_the_session() {
    let unsubscribed = Arc::new(AtomicBool::new(false));
    let cfg = TrackerCfg {
        duration: Some(Duration::from_secs(1)),
        ..TrackerCfg::default()
    };
    let mut tracker = Tracker::builder()
        .with_source(IdleSource {
            unsubscribed: unsubscribed.clone(),
        })
        .with_config(cfg)
        .with_clock(clock())
        .build()
        .unwrap();
    let summary = tracker.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(summary.elapsed, Duration::from_secs(1));
    assert_eq!(summary.processed, 0);
    assert!(unsubscribed.load(Ordering::SeqCst));
}

#[test]
fn preset_shutdown_returns_immediately() {
    let unsubscribed = Arc::new(AtomicBool::new(false));
    let mut tracker = Tracker::builder()
        .with_source(IdleSource {
            unsubscribed: unsubscribed.clone(),
        })
        .with_clock(clock())
        .build()
        .unwrap();
    let summary = tracker.run(&AtomicBool::new(true)).unwrap();
    assert_eq!(summary.elapsed, Duration::ZERO);
    assert!(unsubscribed.load(Ordering::SeqCst));
}

#[test]
fn save_failure_is_reported_in_summary() {
    let dir = tempdir().unwrap();
    // data_dir collides with an existing file
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, b"x").unwrap();
    let cfg = TrackerCfg {
        save_data: true,
        data_dir: blocker,
        ..TrackerCfg::default()
    };
    let mut tracker = Tracker::builder()
        .with_source(ReplaySource::new(steady_samples(5)))
        .with_config(cfg)
        .with_clock(clock())
        .build()
        .unwrap();
    let summary = tracker.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(summary.processed, 5);
    assert!(summary.saved_to.is_none());
    assert!(summary.save_error.is_some());
}

#[test]
fn nothing_is_processed_after_the_stop_flag_is_set() {
    let cfg = TrackerCfg {
        push_stream: true,
        ..fixation_cfg()
    };
    let outlet = RecordingOutlet::new(stream_info("gaze", 600, "test"));
    let aggregator = GazeSampleAggregator::new(AggregatorCfg::default(), cfg.screen_nans);
    let mut pipeline = GazePipeline::new(
        &cfg,
        ScreenSize::default(),
        aggregator,
        clock(),
        Some(Box::new(outlet.clone()) as Box<dyn StreamOutlet>),
    );
    let samples = steady_samples(3);

    assert!(pipeline.process(&samples[0]).is_some());
    assert_eq!(pipeline.aggregator().stats().accepted, 1);

    pipeline.stop_flag().store(true, Ordering::Release);
    for s in &samples[1..] {
        assert!(pipeline.process(s).is_none());
    }
    let stats = pipeline.aggregator().stats();
    assert_eq!((stats.accepted, stats.live), (1, 1));
    assert_eq!(outlet.frames().len(), 1);
}
