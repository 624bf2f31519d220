//! Adaptive low-pass filter (One-Euro style) for one scalar channel.
//!
//! The cutoff frequency rises with the smoothed derivative magnitude: slow
//! signals are heavily smoothed, fast motion passes with little lag.

use std::f64::consts::TAU;

use crate::config::FilterParams;

/// Smoothing factor of an exponential filter for a step `dt` (seconds) at cutoff `fc` (Hz).
#[inline]
pub fn smoothing_factor(dt: f64, cutoff: f64) -> f64 {
    let r = TAU * cutoff * dt;
    r / (r + 1.0)
}

#[inline]
fn exp_smooth(alpha: f64, x: f64, prev: f64) -> f64 {
    alpha * x + (1.0 - alpha) * prev
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveSignalFilter {
    params: FilterParams,
    previous_value: f64,
    previous_derivative: f64,
    previous_time: f64,
}

impl AdaptiveSignalFilter {
    pub fn new(initial_time: f64, initial_value: f64, params: FilterParams) -> Self {
        Self::with_derivative(initial_time, initial_value, 0.0, params)
    }

    pub fn with_derivative(
        initial_time: f64,
        initial_value: f64,
        initial_derivative: f64,
        params: FilterParams,
    ) -> Self {
        Self {
            params,
            previous_value: initial_value,
            previous_derivative: initial_derivative,
            previous_time: initial_time,
        }
    }

    /// Filter `value` observed at time `t` (seconds).
    ///
    /// `t` must be strictly greater than the previous call's time. A
    /// non-positive or non-finite step leaves the state untouched and returns
    /// the previous output.
    pub fn filter(&mut self, t: f64, value: f64) -> f64 {
        let dt = t - self.previous_time;
        if !(dt.is_finite() && dt > 0.0) {
            return self.previous_value;
        }

        let derivative = (value - self.previous_value) / dt;
        let a_d = smoothing_factor(dt, self.params.derivative_cutoff);
        let filtered_derivative = exp_smooth(a_d, derivative, self.previous_derivative);

        let cutoff = self.params.min_cutoff + self.params.beta * filtered_derivative.abs();
        let a = smoothing_factor(dt, cutoff);
        let filtered = exp_smooth(a, value, self.previous_value);

        self.previous_value = filtered;
        self.previous_derivative = filtered_derivative;
        self.previous_time = t;
        filtered
    }

    #[inline]
    pub fn previous_time(&self) -> f64 {
        self.previous_time
    }

    #[inline]
    pub fn previous_value(&self) -> f64 {
        self.previous_value
    }

    #[inline]
    pub fn previous_derivative(&self) -> f64 {
        self.previous_derivative
    }

    #[inline]
    pub fn params(&self) -> FilterParams {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_factor_matches_closed_form() {
        // r = 2*pi*1*0.5 = pi
        let a = smoothing_factor(0.5, 1.0);
        let r = std::f64::consts::PI;
        assert!((a - r / (r + 1.0)).abs() < 1e-12);
        assert_eq!(smoothing_factor(0.0, 3.0), 0.0);
    }

    #[test]
    fn one_step_follows_the_recurrence() {
        let p = FilterParams {
            min_cutoff: 1.0,
            beta: 0.5,
            derivative_cutoff: 1.0,
        };
        let mut f = AdaptiveSignalFilter::new(0.0, 0.0, p);
        let out = f.filter(0.1, 1.0);

        let a_d = smoothing_factor(0.1, 1.0);
        let d_hat = a_d * 10.0;
        let a = smoothing_factor(0.1, 1.0 + 0.5 * d_hat);
        assert!((out - a).abs() < 1e-12);
        assert!((f.previous_derivative() - d_hat).abs() < 1e-12);
        assert_eq!(f.previous_time(), 0.1);
    }

    #[test]
    fn non_increasing_time_is_ignored() {
        let mut f = AdaptiveSignalFilter::new(1.0, 0.25, FilterParams::default());
        assert_eq!(f.filter(1.0, 9.0), 0.25);
        assert_eq!(f.filter(0.5, 9.0), 0.25);
        assert_eq!(f.previous_time(), 1.0);
    }
}
