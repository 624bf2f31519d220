use eta_core::{ClassifierCfg, EtaError, EyeClassifier, FixationClassifier};
use eta_traits::{EyeSample, GazeSample};
use rstest::rstest;

const DT: f64 = 1.0 / 600.0;

fn cfg(threshold: f64) -> ClassifierCfg {
    ClassifierCfg {
        velocity_threshold: threshold,
        ..ClassifierCfg::default()
    }
}

/// Feed a steady point long enough for both filters to settle.
fn settled_eye(threshold: f64, point: (f64, f64)) -> (EyeClassifier, f64) {
    let mut eye = EyeClassifier::new(0.0, &cfg(threshold));
    let mut t = 0.0;
    for _ in 0..1200 {
        t += DT;
        eye.update(t, Some(point)).unwrap();
    }
    (eye, t)
}

#[test]
fn steady_gaze_fixates_with_growing_duration_then_resets_on_jump() {
    let (mut eye, mut t) = settled_eye(1.5, (0.5, 0.5));
    let onset = eye.state().onset;
    assert!(onset.is_some());

    let mut last = eye.state().duration;
    for _ in 0..50 {
        t += DT;
        let s = eye.update(t, Some((0.5, 0.5))).unwrap();
        assert!(s.is_fixated);
        assert!(s.velocity <= 1.5);
        assert!(s.duration > last, "duration must grow while fixated");
        assert_eq!(s.onset, onset, "onset is held for the whole fixation");
        last = s.duration;
    }

    t += DT;
    let s = eye.update(t, Some((0.9, 0.1))).unwrap();
    assert!(!s.is_fixated);
    assert!(s.velocity > 1.5);
    assert_eq!(s.duration, 0.0);
    assert_eq!(s.onset, None);
}

#[test]
fn new_fixation_gets_new_onset() {
    let (mut eye, mut t) = settled_eye(1.5, (0.2, 0.2));
    let first = eye.state().onset.unwrap();

    t += DT;
    eye.update(t, Some((0.8, 0.8))).unwrap();
    assert!(!eye.state().is_fixated);

    let mut second = None;
    for _ in 0..1200 {
        t += DT;
        let s = eye.update(t, Some((0.8, 0.8))).unwrap();
        if s.is_fixated && second.is_none() {
            second = s.onset;
            assert_eq!(s.onset, Some(t));
            assert_eq!(s.duration, 0.0);
        }
    }
    let second = second.expect("eye should fixate again");
    assert!(second > first);
    assert_eq!(eye.state().onset, Some(second));
}

#[rstest]
#[case(0.0)]
#[case(-1.0)]
#[case(f64::NAN)]
fn non_advancing_time_is_a_sample_error(#[case] dt: f64) {
    let mut c = FixationClassifier::new(0.0, &cfg(1.5));
    c.classify(&GazeSample::binocular(1.0, 0.5, 0.5)).unwrap();
    let err = c
        .classify(&GazeSample::binocular(1.0 + dt, 0.5, 0.5))
        .unwrap_err();
    assert!(matches!(err, EtaError::Sample(_)));
}

#[test]
fn eyes_are_classified_independently() {
    let mut c = FixationClassifier::new(0.0, &cfg(1.5));
    let mut t = 0.0;
    for _ in 0..1200 {
        t += DT;
        c.classify(&GazeSample::binocular(t, 0.5, 0.5)).unwrap();
    }
    t += DT;
    let mut s = GazeSample::binocular(t, 0.5, 0.5);
    s.right = EyeSample::missing();
    let (left, right) = c.classify(&s).unwrap();
    assert!(left.is_fixated);
    assert!(!right.is_fixated);
    assert_eq!(right.duration, 0.0);
    assert!(right.filtered.is_none());
}

#[test]
fn velocity_is_never_negative() {
    let mut eye = EyeClassifier::new(0.0, &cfg(0.5));
    let mut t = 0.0;
    for i in 0..500 {
        t += DT;
        let x = if i % 7 == 0 { 0.9 } else { 0.1 };
        let s = eye.update(t, Some((x, 1.0 - x))).unwrap();
        assert!(s.velocity >= 0.0);
    }
}
