//! Deterministic synthetic sample source driven by an explicit timestamp.

use eta_traits::{EyeSample, GazeSample};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{DeviceError, Result};
use crate::path::MockPath;
use crate::util::clamp_unit;

/// Mean and half-range of the simulated pupil diameter (mm).
pub const PUPIL_MEAN_MM: f64 = 8.0;
pub const PUPIL_SPREAD_MM: f64 = 4.0;

#[derive(Debug)]
pub struct GazeGenerator {
    path: MockPath,
    noise: f64,
    nan_probability: f64,
    rng: StdRng,
    start: Option<f64>,
}

impl GazeGenerator {
    /// `noise` is the half-width of the uniform jitter added to each axis.
    pub fn new(path: MockPath, noise: f64, nan_probability: f64, seed: Option<u64>) -> Result<Self> {
        if !(noise.is_finite() && noise >= 0.0) {
            return Err(DeviceError::InvalidParam("noise must be finite and >= 0"));
        }
        if !(0.0..=1.0).contains(&nan_probability) {
            return Err(DeviceError::InvalidParam("nan_probability must be in [0, 1]"));
        }
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Ok(Self {
            path,
            noise,
            nan_probability,
            rng,
            start: None,
        })
    }

    pub fn path(&self) -> MockPath {
        self.path
    }

    /// Sample at wall-clock time `t`. The first call fixes the path origin.
    pub fn sample_at(&mut self, t: f64) -> GazeSample {
        let start = *self.start.get_or_insert(t);
        let (x, y) = self.path.position(t - start);
        GazeSample {
            device_timestamp: t,
            host_timestamp: t,
            left: self.eye(x, y),
            right: self.eye(x, y),
        }
    }

    fn jitter(&mut self) -> f64 {
        if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        }
    }

    fn eye(&mut self, x: f64, y: f64) -> EyeSample {
        let gaze_point = if self.rng.gen_bool(self.nan_probability) {
            [f64::NAN, f64::NAN]
        } else {
            let jx = self.jitter();
            let jy = self.jitter();
            [clamp_unit(x + jx), clamp_unit(y + jy)]
        };
        let pupil = PUPIL_SPREAD_MM.mul_add(self.rng.gen_range(-1.0..=1.0), PUPIL_MEAN_MM);
        EyeSample {
            gaze_point: Some(gaze_point),
            pupil_diameter: Some(pupil),
            gaze_valid: self.rng.gen_bool(0.5),
            pupil_valid: self.rng.gen_bool(0.5),
        }
    }
}
