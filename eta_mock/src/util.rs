use std::time::Duration;

use crate::error::{DeviceError, Result};

/// Sleep between emitted samples for `rate_hz`, slightly short of the nominal
/// period so the effective rate never falls below it.
pub fn sample_period(rate_hz: u32) -> Result<Duration> {
    if rate_hz == 0 {
        return Err(DeviceError::InvalidRate);
    }
    Ok(Duration::from_secs_f64(0.99 / f64::from(rate_hz)))
}

/// Largest value strictly below 1.0.
pub const BELOW_ONE: f64 = 1.0 - f64::EPSILON / 2.0;

/// Clamp a normalized coordinate into `[0, 1)`.
#[inline]
pub fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, BELOW_ONE)
}
