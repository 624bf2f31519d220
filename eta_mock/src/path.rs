//! Scripted gaze trajectories in normalized display coordinates.

use std::f64::consts::TAU;

/// Seconds for one lap of the circle path.
pub const CIRCLE_PERIOD_S: f64 = 8.0;
pub const CIRCLE_RADIUS: f64 = 0.3;
/// Seconds spent on each cell of the grid path.
pub const GRID_DWELL_S: f64 = 2.0;
/// Cell centres of the 3x3 grid path, per axis.
pub const GRID_STOPS: [f64; 3] = [0.1, 0.5, 0.9];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockPath {
    /// Screen centre.
    Fixed,
    /// Constant-speed circle around the centre.
    #[default]
    Circle,
    /// Row-major walk over a 3x3 grid, holding each cell.
    Grid,
}

impl MockPath {
    /// Position `elapsed` seconds after the path started.
    pub fn position(self, elapsed: f64) -> (f64, f64) {
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        match self {
            Self::Fixed => (0.5, 0.5),
            Self::Circle => {
                let a = TAU * elapsed / CIRCLE_PERIOD_S;
                (0.5 + CIRCLE_RADIUS * a.cos(), 0.5 + CIRCLE_RADIUS * a.sin())
            }
            Self::Grid => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let cell = (elapsed / GRID_DWELL_S) as usize % 9;
                (GRID_STOPS[cell % 3], GRID_STOPS[cell / 3])
            }
        }
    }
}
