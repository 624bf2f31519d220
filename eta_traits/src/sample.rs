//! Raw measurements delivered by a gaze producer.

/// One eye's raw measurement.
///
/// `gaze_point` is in normalized display coordinates (`[0, 1]` on both axes,
/// origin at the top-left). Devices report lost tracking either by omitting the
/// point or by filling it with NaN; both are treated as missing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EyeSample {
    pub gaze_point: Option<[f64; 2]>,
    pub pupil_diameter: Option<f64>,
    pub gaze_valid: bool,
    pub pupil_valid: bool,
}

impl EyeSample {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            gaze_point: Some([x, y]),
            pupil_diameter: None,
            gaze_valid: true,
            pupil_valid: false,
        }
    }

    /// An eye with no usable measurement.
    pub fn missing() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_pupil(mut self, diameter: f64) -> Self {
        self.pupil_diameter = Some(diameter);
        self.pupil_valid = true;
        self
    }

    /// The gaze point if present and finite on both axes.
    #[inline]
    pub fn point(&self) -> Option<(f64, f64)> {
        match self.gaze_point {
            Some([x, y]) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }

    /// The pupil diameter if present and finite.
    #[inline]
    pub fn pupil(&self) -> Option<f64> {
        self.pupil_diameter.filter(|p| p.is_finite())
    }
}

/// One binocular sample as delivered by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GazeSample {
    /// Device clock, seconds. Opaque; only carried through.
    pub device_timestamp: f64,
    /// Host clock, seconds since the Unix epoch. Drives filtering and grouping.
    pub host_timestamp: f64,
    pub left: EyeSample,
    pub right: EyeSample,
}

impl GazeSample {
    /// Both eyes looking at the same normalized point.
    pub fn binocular(host_timestamp: f64, x: f64, y: f64) -> Self {
        Self {
            device_timestamp: host_timestamp,
            host_timestamp,
            left: EyeSample::new(x, y),
            right: EyeSample::new(x, y),
        }
    }
}

/// Identity of the device behind a `GazeSource`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub address: String,
    pub model: String,
    pub name: String,
    pub serial: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_point_counts_as_missing() {
        let mut e = EyeSample::new(0.2, f64::NAN);
        assert_eq!(e.point(), None);
        e.gaze_point = Some([0.2, 0.4]);
        assert_eq!(e.point(), Some((0.2, 0.4)));
        assert_eq!(EyeSample::missing().point(), None);
    }

    #[test]
    fn pupil_filters_non_finite() {
        assert_eq!(EyeSample::new(0.0, 0.0).with_pupil(f64::NAN).pupil(), None);
        assert_eq!(EyeSample::new(0.0, 0.0).with_pupil(3.5).pupil(), Some(3.5));
    }
}
