//! Per-eye fixation/saccade labelling.
//!
//! Each eye owns two adaptive filters (x and y). The "velocity" of a sample is
//! the distance between the filtered estimate and the raw point divided by the
//! time since the previous filtered sample, i.e. how far the raw signal
//! disagrees with its smoothed trend per second. It is not a positional
//! derivative and classifies differently from one.

use eta_traits::GazeSample;

use crate::config::ClassifierCfg;
use crate::error::EtaError;
use crate::filter::AdaptiveSignalFilter;

/// Fixation state of one eye after the latest sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixationState {
    pub is_fixated: bool,
    /// Filter disagreement per second; always >= 0.
    pub velocity: f64,
    /// Filtered (x, y) for the latest sample; `None` when the eye had no point.
    pub filtered: Option<(f64, f64)>,
    /// First sample time of the current fixation.
    pub onset: Option<f64>,
    /// Time since the previous filtered sample, seconds.
    pub elapsed: f64,
    /// Seconds spent in the current fixation; 0 outside fixations.
    pub duration: f64,
}

impl Default for FixationState {
    fn default() -> Self {
        Self {
            is_fixated: false,
            velocity: 0.0,
            filtered: None,
            onset: None,
            elapsed: 0.0,
            duration: 0.0,
        }
    }
}

impl FixationState {
    fn enter_saccade(&mut self) {
        self.is_fixated = false;
        self.onset = None;
        self.duration = 0.0;
    }
}

/// Classifier for one eye.
#[derive(Debug, Clone)]
pub struct EyeClassifier {
    x: AdaptiveSignalFilter,
    y: AdaptiveSignalFilter,
    velocity_threshold: f64,
    state: FixationState,
}

impl EyeClassifier {
    /// Filters start at the origin at `start_time`.
    pub fn new(start_time: f64, cfg: &ClassifierCfg) -> Self {
        Self {
            x: AdaptiveSignalFilter::new(start_time, 0.0, cfg.filter),
            y: AdaptiveSignalFilter::new(start_time, 0.0, cfg.filter),
            velocity_threshold: cfg.velocity_threshold,
            state: FixationState::default(),
        }
    }

    /// Earlier of the two axis filters' last update times.
    #[inline]
    pub fn previous_time(&self) -> f64 {
        self.x.previous_time().min(self.y.previous_time())
    }

    #[inline]
    pub fn state(&self) -> FixationState {
        self.state
    }

    /// Reject `t` unless it moves strictly forward.
    fn check_time(&self, t: f64) -> Result<(), EtaError> {
        let prev = self.previous_time();
        if t.is_finite() && t > prev {
            Ok(())
        } else {
            Err(EtaError::Sample(format!(
                "timestamp {t} does not advance past {prev}"
            )))
        }
    }

    /// Feed one sample. `point` is `None` when the eye was not tracked; the
    /// filters are then left alone and the eye drops out of any fixation.
    pub fn update(&mut self, t: f64, point: Option<(f64, f64)>) -> Result<FixationState, EtaError> {
        self.check_time(t)?;
        self.apply(t, point);
        Ok(self.state)
    }

    fn apply(&mut self, t: f64, point: Option<(f64, f64)>) {
        let Some((px, py)) = point else {
            self.state.enter_saccade();
            self.state.filtered = None;
            self.state.elapsed = 0.0;
            return;
        };

        let previous_t = self.previous_time();
        let fx = self.x.filter(t, px);
        let fy = self.y.filter(t, py);
        let elapsed = t - previous_t;
        let velocity = (fx - px).hypot(fy - py) / elapsed;
        let fixated = velocity <= self.velocity_threshold;

        let s = &mut self.state;
        s.velocity = velocity;
        s.filtered = Some((fx, fy));
        s.elapsed = elapsed;
        if fixated {
            if s.is_fixated {
                s.duration += elapsed;
            } else {
                s.is_fixated = true;
                s.onset = Some(t);
                s.duration = 0.0;
            }
        } else {
            s.enter_saccade();
        }
        tracing::trace!(t, velocity, fixated, "eye classified");
    }
}

/// Binocular classifier: one `EyeClassifier` per eye.
#[derive(Debug, Clone)]
pub struct FixationClassifier {
    left: EyeClassifier,
    right: EyeClassifier,
}

impl FixationClassifier {
    pub fn new(start_time: f64, cfg: &ClassifierCfg) -> Self {
        Self {
            left: EyeClassifier::new(start_time, cfg),
            right: EyeClassifier::new(start_time, cfg),
        }
    }

    /// Classify both eyes of `sample` at its host timestamp.
    ///
    /// A timestamp that does not advance for either eye rejects the whole
    /// sample and leaves both eyes unchanged.
    pub fn classify(
        &mut self,
        sample: &GazeSample,
    ) -> Result<(FixationState, FixationState), EtaError> {
        let t = sample.host_timestamp;
        self.left.check_time(t)?;
        self.right.check_time(t)?;
        self.left.apply(t, sample.left.point());
        self.right.apply(t, sample.right.point());
        Ok((self.left.state, self.right.state))
    }

    pub fn left(&self) -> &EyeClassifier {
        &self.left
    }

    pub fn right(&self) -> &EyeClassifier {
        &self.right
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eta_traits::EyeSample;

    fn cfg(threshold: f64) -> ClassifierCfg {
        ClassifierCfg {
            velocity_threshold: threshold,
            ..ClassifierCfg::default()
        }
    }

    #[test]
    fn velocity_is_filter_disagreement_over_time() {
        let c = cfg(1e9);
        let mut eye = EyeClassifier::new(0.0, &c);
        let s = eye.update(0.5, Some((0.3, 0.4))).unwrap();
        let (fx, fy) = s.filtered.unwrap();
        let expected = (fx - 0.3).hypot(fy - 0.4) / 0.5;
        assert!((s.velocity - expected).abs() < 1e-12);
        assert!(s.velocity >= 0.0);
        assert!(s.is_fixated);
        assert_eq!(s.onset, Some(0.5));
        assert_eq!(s.duration, 0.0);
    }

    #[test]
    fn missing_point_breaks_fixation_without_touching_filters() {
        let c = cfg(1e9);
        let mut eye = EyeClassifier::new(0.0, &c);
        eye.update(0.1, Some((0.5, 0.5))).unwrap();
        eye.update(0.2, Some((0.5, 0.5))).unwrap();
        let before = eye.previous_time();
        let s = eye.update(0.3, None).unwrap();
        assert!(!s.is_fixated);
        assert_eq!(s.duration, 0.0);
        assert_eq!(s.onset, None);
        assert_eq!(eye.previous_time(), before);
    }

    #[test]
    fn stale_timestamp_rejects_both_eyes() {
        let mut c = FixationClassifier::new(0.0, &cfg(1e9));
        let ok = GazeSample::binocular(1.0, 0.5, 0.5);
        c.classify(&ok).unwrap();
        let before = (c.left().state(), c.right().state());

        let mut stale = GazeSample::binocular(1.0, 0.9, 0.9);
        stale.right = EyeSample::missing();
        let err = c.classify(&stale).unwrap_err();
        assert!(matches!(err, EtaError::Sample(_)));
        assert_eq!((c.left().state(), c.right().state()), before);
    }
}
