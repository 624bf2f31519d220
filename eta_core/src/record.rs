//! Classified samples and their persisted shape.

use eta_traits::{EyeSample, GazeSample};
use serde::{Deserialize, Serialize};

use crate::classifier::FixationState;
use crate::config::ScreenSize;

/// One eye of an `EnrichedGazeRecord`. Field names match the gaze log file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EyeRecord {
    pub gaze_point: Option<[f64; 2]>,
    #[serde(default)]
    pub pupil_diameter: Option<f64>,
    #[serde(default)]
    pub fixated: bool,
    #[serde(default)]
    pub velocity: f64,
    #[serde(default)]
    pub filtered_gaze_point: Option<[f64; 2]>,
    #[serde(default)]
    pub fixation_timestamp: Option<f64>,
    #[serde(default)]
    pub fixation_elapsed: f64,
    /// Pixel position on the session screen; derived, never persisted.
    #[serde(skip)]
    pub pixel: Option<[i32; 2]>,
}

impl EyeRecord {
    pub fn new(raw: &EyeSample, state: &FixationState, screen: ScreenSize, screen_nans: bool) -> Self {
        let point = raw.point();
        Self {
            gaze_point: point.map(|(x, y)| [x, y]),
            pupil_diameter: raw.pupil(),
            fixated: state.is_fixated,
            velocity: state.velocity,
            filtered_gaze_point: state.filtered.map(|(x, y)| [x, y]),
            fixation_timestamp: state.onset,
            fixation_elapsed: state.duration,
            pixel: to_pixel(point, screen, screen_nans),
        }
    }

    /// Gaze point if present and finite on both axes.
    pub fn point(&self) -> Option<(f64, f64)> {
        match self.gaze_point {
            Some([x, y]) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }
}

/// Normalized point to pixels.
///
/// With `screen_nans` a missing point becomes the origin and the result is
/// clamped to `[0, dim - 1]`; without it a missing point stays missing.
#[allow(clippy::cast_possible_truncation)]
pub fn to_pixel(point: Option<(f64, f64)>, screen: ScreenSize, screen_nans: bool) -> Option<[i32; 2]> {
    let (w, h) = screen.as_f64();
    match point {
        Some((x, y)) => {
            let px = (x * w).floor();
            let py = (y * h).floor();
            if screen_nans {
                Some([px.clamp(0.0, w - 1.0) as i32, py.clamp(0.0, h - 1.0) as i32])
            } else {
                Some([px as i32, py as i32])
            }
        }
        None if screen_nans => Some([0, 0]),
        None => None,
    }
}

/// A gaze sample with both eyes' fixation state attached.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnrichedGazeRecord {
    /// Host time, seconds since the Unix epoch.
    pub timestamp: f64,
    #[serde(default)]
    pub device_time_stamp: f64,
    pub left_eye: EyeRecord,
    pub right_eye: EyeRecord,
}

impl EnrichedGazeRecord {
    pub fn new(
        sample: &GazeSample,
        left: &FixationState,
        right: &FixationState,
        screen: ScreenSize,
        screen_nans: bool,
    ) -> Self {
        Self {
            timestamp: sample.host_timestamp,
            device_time_stamp: sample.device_timestamp,
            left_eye: EyeRecord::new(&sample.left, left, screen, screen_nans),
            right_eye: EyeRecord::new(&sample.right, right, screen, screen_nans),
        }
    }

    /// Pixel of the left eye, or of the right eye when only it was tracked.
    /// With neither eye tracked this is the left eye's screened pixel.
    pub fn display_pixel(&self) -> Option<[i32; 2]> {
        if self.left_eye.point().is_none() && self.right_eye.point().is_some() {
            self.right_eye.pixel
        } else {
            self.left_eye.pixel
        }
    }

    /// Onset of the fixation this sample belongs to, left eye first.
    pub fn fixation_onset(&self) -> Option<f64> {
        if self.left_eye.fixated {
            self.left_eye.fixation_timestamp
        } else if self.right_eye.fixated {
            self.right_eye.fixation_timestamp
        } else {
            None
        }
    }
}
