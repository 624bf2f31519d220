use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use eta_mock::util::sample_period;
use eta_mock::{DeviceError, GazeGenerator, MOCK_SERIAL, MockConfig, MockEyeTracker, MockPath};
use eta_traits::{GazeSample, GazeSource, ManualClock};
use rstest::rstest;

fn run_generator(seed: u64, n: usize) -> Vec<GazeSample> {
    let mut g = GazeGenerator::new(MockPath::Circle, 0.01, 0.1, Some(seed)).unwrap();
    (0..n).map(|i| g.sample_at(100.0 + i as f64 / 600.0)).collect()
}

#[test]
fn seeded_generators_repeat_exactly() {
    let a = run_generator(42, 200);
    let b = run_generator(42, 200);
    // NaN != NaN, so compare bit patterns
    let bits = |v: &[GazeSample]| -> Vec<u64> {
        v.iter()
            .flat_map(|s| [s.left, s.right])
            .flat_map(|e| e.gaze_point.unwrap_or([0.0, 0.0]))
            .map(f64::to_bits)
            .collect()
    };
    assert_eq!(bits(&a), bits(&b));
    assert_ne!(bits(&a), bits(&run_generator(43, 200)));
}

#[rstest]
#[case::fixed(MockPath::Fixed)]
#[case::circle(MockPath::Circle)]
#[case::grid(MockPath::Grid)]
fn points_stay_in_unit_square_with_pupil_in_range(#[case] path: MockPath) {
    let mut g = GazeGenerator::new(path, 0.5, 0.0, Some(7)).unwrap();
    for i in 0..2000 {
        let s = g.sample_at(f64::from(i) / 60.0);
        for eye in [s.left, s.right] {
            let (x, y) = eye.point().expect("no gaps requested");
            assert!((0.0..1.0).contains(&x) && (0.0..1.0).contains(&y), "{x},{y}");
            let p = eye.pupil().unwrap();
            assert!((4.0..=12.0).contains(&p), "pupil {p}");
        }
        assert_eq!(s.host_timestamp, f64::from(i) / 60.0);
    }
}

#[test]
fn fixed_path_without_noise_is_the_centre() {
    let mut g = GazeGenerator::new(MockPath::Fixed, 0.0, 0.0, Some(1)).unwrap();
    let s = g.sample_at(5.0);
    assert_eq!(s.left.point(), Some((0.5, 0.5)));
    assert_eq!(s.right.point(), Some((0.5, 0.5)));
}

#[test]
fn certain_gaps_yield_missing_points() {
    let mut g = GazeGenerator::new(MockPath::Fixed, 0.0, 1.0, Some(1)).unwrap();
    for i in 0..50 {
        let s = g.sample_at(f64::from(i));
        assert_eq!(s.left.point(), None);
        assert_eq!(s.right.point(), None);
    }
}

#[rstest]
#[case::negative_noise(-0.1, 0.0)]
#[case::nan_noise(f64::NAN, 0.0)]
#[case::probability_above_one(0.0, 1.5)]
#[case::negative_probability(0.0, -0.1)]
fn rejects_bad_parameters(#[case] noise: f64, #[case] nan_probability: f64) {
    let err = GazeGenerator::new(MockPath::Fixed, noise, nan_probability, None).unwrap_err();
    assert!(matches!(err, DeviceError::InvalidParam(_)), "{err:?}");
}

#[test]
fn zero_rate_is_rejected() {
    assert!(matches!(sample_period(0), Err(DeviceError::InvalidRate)));
    let cfg = MockConfig {
        data_rate: 0,
        ..MockConfig::default()
    };
    assert!(matches!(MockEyeTracker::new(cfg), Err(DeviceError::InvalidRate)));
}

#[test]
fn period_is_slightly_under_nominal() {
    let p = sample_period(100).unwrap();
    assert!((p.as_secs_f64() - 0.0099).abs() < 1e-9, "{p:?}");
}

#[test]
fn reports_mock_identity() {
    let tracker = MockEyeTracker::new(MockConfig::default()).unwrap();
    let info = tracker.info();
    assert_eq!(info.serial, MOCK_SERIAL);
    assert_eq!(info.name, "Mock Tracker");
    assert!(tracker.is_connected());
}

#[test]
fn subscribe_streams_until_unsubscribed() {
    let cfg = MockConfig {
        data_rate: 1000,
        seed: Some(3),
        clock: Arc::new(ManualClock::starting_at(1000.0)),
        ..MockConfig::default()
    };
    let mut tracker = MockEyeTracker::new(cfg).unwrap();
    let period = tracker.period().as_secs_f64();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    tracker
        .subscribe(Box::new(move |s: GazeSample| {
            sink.lock().unwrap().push(s.host_timestamp);
            // the manual clock never blocks; pace the worker
            thread::sleep(Duration::from_millis(1));
        }))
        .unwrap();
    assert!(tracker.is_running());

    thread::sleep(Duration::from_millis(100));
    tracker.unsubscribe();
    assert!(!tracker.is_running());

    let ts = received.lock().unwrap().clone();
    assert!(ts.len() > 5, "expected a steady stream, got {}", ts.len());
    assert!((ts[0] - (1000.0 + period)).abs() < 1e-9);
    assert!(
        ts.windows(2).all(|w| (w[1] - w[0] - period).abs() < 1e-9),
        "one sample per period"
    );

    // joined: nothing arrives after unsubscribe returns
    thread::sleep(Duration::from_millis(20));
    assert_eq!(received.lock().unwrap().len(), ts.len());
}

#[test]
fn resubscribe_replaces_the_handler_and_drop_joins() {
    let cfg = MockConfig {
        data_rate: 1000,
        ..MockConfig::default()
    };
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    {
        let mut tracker = MockEyeTracker::new(cfg).unwrap();
        let f = first.clone();
        tracker
            .subscribe(Box::new(move |_: GazeSample| {
                f.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        let s = second.clone();
        tracker
            .subscribe(Box::new(move |_: GazeSample| {
                s.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        let first_after_swap = first.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(first.load(Ordering::SeqCst), first_after_swap);
    }
    let settled = second.load(Ordering::SeqCst);
    assert!(settled > 0);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(second.load(Ordering::SeqCst), settled);
}
