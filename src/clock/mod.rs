//! Clock source for the timer.
//!
//! All time used by the state machine comes from a [`Clock`]. Remaining time
//! is always derived as `deadline - now`, so any evaluation cadence yields
//! the same answer.
//!
//! [`SuspendDetector`] compares wall time against monotonic time to notice
//! that the host was asleep, which is the native counterpart of a
//! visibility or focus-regain signal.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ============================================================================
// Timestamp
// ============================================================================

/// A wall-clock instant in milliseconds since the Unix epoch.
///
/// Signed so that clock adjustments producing negative deltas stay
/// representable; consumers clamp derived durations at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Returns this instant shifted by a (possibly fractional) number of seconds.
    #[must_use]
    pub fn add_seconds(self, seconds: f64) -> Self {
        if !seconds.is_finite() {
            return self;
        }
        Self(self.0.saturating_add((seconds * 1000.0).round() as i64))
    }

    /// Returns the signed number of seconds from `self` until `later`.
    pub fn seconds_until(self, later: Timestamp) -> f64 {
        later.0.saturating_sub(self.0) as f64 / 1000.0
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Reads the host wall clock.
///
/// Wall time keeps advancing while the host sleeps, so a deadline set before
/// a suspension is still honored after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => Timestamp(elapsed.as_millis() as i64),
            Err(e) => Timestamp(-(e.duration().as_millis() as i64)),
        }
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.as_millis()),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.millis.store(now.as_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    /// Advances by fractional seconds; negative values move the clock back.
    pub fn advance_secs(&self, seconds: f64) {
        self.millis
            .fetch_add((seconds * 1000.0).round() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.millis.load(Ordering::SeqCst))
    }
}

// ============================================================================
// SuspendDetector
// ============================================================================

/// Detects host suspension from drift between wall and monotonic time.
///
/// `Instant` does not advance while the host sleeps on most platforms, but
/// the wall clock does. A wall-clock gap that monotonic time cannot account
/// for means evaluation was suspended.
#[derive(Debug, Clone)]
pub struct SuspendDetector {
    last_wall: Timestamp,
    last_mono: Instant,
    threshold: Duration,
}

impl SuspendDetector {
    #[must_use]
    pub fn new(wall: Timestamp, mono: Instant, threshold: Duration) -> Self {
        Self {
            last_wall: wall,
            last_mono: mono,
            threshold,
        }
    }

    /// Records an observation and returns the unexplained gap, if any.
    ///
    /// Backward wall-clock jumps are not reported as suspensions.
    pub fn observe(&mut self, wall: Timestamp, mono: Instant) -> Option<Duration> {
        let wall_elapsed = wall.as_millis().saturating_sub(self.last_wall.as_millis());
        let mono_elapsed = mono.saturating_duration_since(self.last_mono).as_millis() as i64;

        self.last_wall = wall;
        self.last_mono = mono;

        let gap = wall_elapsed.saturating_sub(mono_elapsed);
        if gap > self.threshold.as_millis() as i64 {
            Some(Duration::from_millis(gap as u64))
        } else {
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
