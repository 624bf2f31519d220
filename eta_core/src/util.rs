//! Time conversion helpers for eta_core.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Seconds (f64) to whole microseconds, saturating; NaN maps to 0.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub fn secs_to_micros(secs: f64) -> i64 {
    // `as` saturates on overflow and maps NaN to 0
    (secs * MICROS_PER_SEC).round() as i64
}
