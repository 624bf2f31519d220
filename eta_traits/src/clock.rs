use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Time source shared by the producer, the session loop and the mock tracker.
///
/// - now(): monotonic instant used for pacing and session deadlines
/// - sleep(): blocks (or, for test clocks, advances) by the given duration
/// - unix_secs(): wall-clock seconds since the Unix epoch, used to stamp samples
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Wall-clock time in fractional seconds since the Unix epoch.
    fn unix_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64())
    }
}

/// Real-time clock backed by `Instant` and `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock whose time only moves when advanced.
///
/// now() = origin + offset, unix_secs() = base + offset.
/// sleep(d) advances the offset by d without blocking, so session loops
/// driven by this clock finish instantly.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    unix_base: f64,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    /// Clock whose `unix_secs()` starts at `unix_base`.
    pub fn starting_at(unix_base: f64) -> Self {
        Self {
            origin: Instant::now(),
            unix_base,
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }

    pub fn set_offset(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = d;
        }
    }

    fn offset(&self) -> Duration {
        self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }

    fn unix_secs(&self) -> f64 {
        self.unix_base + self.offset().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let c = ManualClock::starting_at(100.0);
        let t0 = c.now();
        assert_eq!(c.now(), t0);
        c.sleep(Duration::from_millis(250));
        assert_eq!(c.now().duration_since(t0), Duration::from_millis(250));
        assert!((c.unix_secs() - 100.25).abs() < 1e-9);
        c.set_offset(Duration::from_secs(2));
        assert!((c.unix_secs() - 102.0).abs() < 1e-9);
    }

    #[test]
    fn monotonic_unix_secs_is_recent() {
        // 2020-01-01
        assert!(MonotonicClock::new().unix_secs() > 1_577_836_800.0);
    }
}
