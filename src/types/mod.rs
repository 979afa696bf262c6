//! Core data types for the focus timer.
//!
//! This module defines the data structures used for:
//! - Session mode and run status
//! - Duration configuration with clamping
//! - Immutable snapshots consumed by presentation layers
//! - Runtime cadence configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Default focus duration in minutes.
pub const DEFAULT_FOCUS_MINUTES: u32 = 30;

/// Default break duration in minutes.
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// Smallest configurable duration in minutes.
pub const MIN_MINUTES: u32 = 1;

/// Largest configurable duration in minutes.
pub const MAX_MINUTES: u32 = 600;

/// How long `just_completed` stays raised after an automatic switch.
pub const JUST_COMPLETED_PULSE: Duration = Duration::from_millis(1500);

// ============================================================================
// Mode
// ============================================================================

/// The two alternating phases of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Focused work
    #[default]
    Focus,
    /// Rest between focus sessions
    Break,
}

impl Mode {
    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Focus => "focus",
            Mode::Break => "break",
        }
    }

    /// Returns the capitalized label used in titles.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Focus => "Focus",
            Mode::Break => "Break",
        }
    }

    /// Returns the mode that follows this one.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Mode::Focus => Mode::Break,
            Mode::Break => Mode::Focus,
        }
    }
}

// ============================================================================
// Status
// ============================================================================

/// Run status of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Not started since the last reset or mode change
    #[default]
    Idle,
    /// Counting down toward the deadline
    Running,
    /// Started, then stopped before completing
    Paused,
}

impl Status {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Running => "running",
            Status::Paused => "paused",
        }
    }

    /// Returns true if the timer is actively counting down.
    pub fn is_running(&self) -> bool {
        matches!(self, Status::Running)
    }
}

// ============================================================================
// DurationSettings
// ============================================================================

/// User-configured focus and break lengths.
///
/// Both values are kept inside `[MIN_MINUTES, MAX_MINUTES]`; every
/// constructor and setter clamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationSettings {
    /// Focus duration in minutes (1-600)
    focus_minutes: u32,
    /// Break duration in minutes (1-600)
    break_minutes: u32,
}

impl Default for DurationSettings {
    fn default() -> Self {
        Self {
            focus_minutes: DEFAULT_FOCUS_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
        }
    }
}

impl DurationSettings {
    /// Creates settings from minute values, clamping both.
    pub fn new(focus_minutes: u32, break_minutes: u32) -> Self {
        Self {
            focus_minutes: clamp_minutes(focus_minutes),
            break_minutes: clamp_minutes(break_minutes),
        }
    }

    /// Returns a copy with the focus duration replaced.
    #[must_use]
    pub fn with_focus_minutes(mut self, minutes: u32) -> Self {
        self.focus_minutes = clamp_minutes(minutes);
        self
    }

    /// Returns a copy with the break duration replaced.
    #[must_use]
    pub fn with_break_minutes(mut self, minutes: u32) -> Self {
        self.break_minutes = clamp_minutes(minutes);
        self
    }

    pub fn focus_minutes(&self) -> u32 {
        self.focus_minutes
    }

    pub fn break_minutes(&self) -> u32 {
        self.break_minutes
    }

    /// Returns the configured minutes for a mode.
    pub fn minutes_for(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Focus => self.focus_minutes,
            Mode::Break => self.break_minutes,
        }
    }

    /// Returns the configured duration for a mode in seconds.
    pub fn seconds_for(&self, mode: Mode) -> f64 {
        f64::from(self.minutes_for(mode) * 60)
    }
}

/// Clamps a minute value into the configurable range.
pub fn clamp_minutes(minutes: u32) -> u32 {
    minutes.clamp(MIN_MINUTES, MAX_MINUTES)
}

// ============================================================================
// TimerSnapshot
// ============================================================================

/// Immutable view of the timer, recomputed on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    /// Current mode
    pub mode: Mode,
    /// Current run status
    pub status: Status,
    /// Cycle number, starting at 1
    #[serde(rename = "cycleCount")]
    pub cycle_count: u32,
    /// Remaining seconds, never negative
    #[serde(rename = "remainingSeconds")]
    pub remaining_seconds: f64,
    /// Nominal length of the current session
    #[serde(rename = "totalSeconds")]
    pub total_seconds: f64,
    /// Remaining fraction in `[0, 1]`
    pub fraction: f64,
    /// Raised briefly after an automatic mode switch
    #[serde(rename = "justCompleted")]
    pub just_completed: bool,
    /// Whether any session was started since launch
    #[serde(rename = "hasStarted")]
    pub has_started: bool,
}

impl TimerSnapshot {
    /// Returns the `mm:ss - Mode` title string.
    pub fn title(&self) -> String {
        format!("{} - {}", format_clock(self.remaining_seconds), self.mode.label())
    }

    /// Returns true when a session was started but the timer is not running.
    ///
    /// Informational only; presentation may show a stopped indicator.
    pub fn is_stopped_after_start(&self) -> bool {
        self.has_started && !self.status.is_running()
    }
}

// ============================================================================
// RuntimeConfig
// ============================================================================

/// Cadences and timeouts used by the evaluation triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Rendering-cadence poll interval
    pub frame_interval: Duration,
    /// Coarse background poll interval
    pub background_interval: Duration,
    /// Upper bound on waiting for the audio device to unlock
    pub unlock_timeout: Duration,
    /// Unexplained wall-clock gap treated as a host suspension
    pub suspend_threshold: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(50),
            background_interval: Duration::from_secs(1),
            unlock_timeout: Duration::from_millis(500),
            suspend_threshold: Duration::from_secs(2),
        }
    }
}

// ============================================================================
// Formatting helpers
// ============================================================================

/// Formats seconds as zero-padded `mm:ss`, flooring fractional seconds.
///
/// Minutes are not wrapped into hours, so 600 minutes renders as `600:00`.
pub fn format_clock(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", whole / 60, whole % 60)
}

/// Clamps a value into `[0, 1]`, mapping NaN to 0.
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Mode Tests
    // ------------------------------------------------------------------------

    mod mode_tests {
        use super::*;

        #[test]
        fn test_default_is_focus() {
            assert_eq!(Mode::default(), Mode::Focus);
        }

        #[test]
        fn test_next_alternates() {
            assert_eq!(Mode::Focus.next(), Mode::Break);
            assert_eq!(Mode::Break.next(), Mode::Focus);
            assert_eq!(Mode::Focus.next().next(), Mode::Focus);
        }

        #[test]
        fn test_labels() {
            assert_eq!(Mode::Focus.as_str(), "focus");
            assert_eq!(Mode::Break.label(), "Break");
        }

        #[test]
        fn test_serialize() {
            let json = serde_json::to_string(&Mode::Break).unwrap();
            assert_eq!(json, "\"break\"");
        }
    }

    // ------------------------------------------------------------------------
    // Status Tests
    // ------------------------------------------------------------------------

    mod status_tests {
        use super::*;

        #[test]
        fn test_default_is_idle() {
            assert_eq!(Status::default(), Status::Idle);
        }

        #[test]
        fn test_is_running() {
            assert!(Status::Running.is_running());
            assert!(!Status::Paused.is_running());
            assert!(!Status::Idle.is_running());
        }
    }

    // ------------------------------------------------------------------------
    // DurationSettings Tests
    // ------------------------------------------------------------------------

    mod duration_settings_tests {
        use super::*;

        #[test]
        fn test_default_values() {
            let settings = DurationSettings::default();
            assert_eq!(settings.focus_minutes(), 30);
            assert_eq!(settings.break_minutes(), 5);
        }

        #[test]
        fn test_new_clamps() {
            let settings = DurationSettings::new(0, 601);
            assert_eq!(settings.focus_minutes(), 1);
            assert_eq!(settings.break_minutes(), 600);
        }

        #[test]
        fn test_builder_pattern_clamps() {
            let settings = DurationSettings::default()
                .with_focus_minutes(45)
                .with_break_minutes(10_000);
            assert_eq!(settings.focus_minutes(), 45);
            assert_eq!(settings.break_minutes(), 600);
        }

        #[test]
        fn test_seconds_for() {
            let settings = DurationSettings::new(30, 5);
            assert_eq!(settings.seconds_for(Mode::Focus), 1800.0);
            assert_eq!(settings.seconds_for(Mode::Break), 300.0);
        }

        #[test]
        fn test_boundary_seconds() {
            let settings = DurationSettings::new(600, 1);
            assert_eq!(settings.seconds_for(Mode::Focus), 36000.0);
            assert_eq!(settings.seconds_for(Mode::Break), 60.0);
        }
    }

    // ------------------------------------------------------------------------
    // Formatting Tests
    // ------------------------------------------------------------------------

    mod format_tests {
        use super::*;

        #[test]
        fn test_format_clock_floors() {
            assert_eq!(format_clock(0.0), "00:00");
            assert_eq!(format_clock(59.999), "00:59");
            assert_eq!(format_clock(1800.0), "30:00");
        }

        #[test]
        fn test_format_clock_long_durations() {
            assert_eq!(format_clock(36000.0), "600:00");
        }

        #[test]
        fn test_format_clock_degenerate_inputs() {
            assert_eq!(format_clock(-5.0), "00:00");
            assert_eq!(format_clock(f64::NAN), "00:00");
        }

        #[test]
        fn test_clamp01() {
            assert_eq!(clamp01(0.5), 0.5);
            assert_eq!(clamp01(1.5), 1.0);
            assert_eq!(clamp01(-0.1), 0.0);
            assert_eq!(clamp01(f64::NAN), 0.0);
        }

        #[test]
        fn test_snapshot_title() {
            let snapshot = TimerSnapshot {
                mode: Mode::Break,
                status: Status::Running,
                cycle_count: 1,
                remaining_seconds: 299.4,
                total_seconds: 300.0,
                fraction: 0.998,
                just_completed: false,
                has_started: true,
            };
            assert_eq!(snapshot.title(), "04:59 - Break");
            assert!(!snapshot.is_stopped_after_start());
        }

        #[test]
        fn test_stopped_after_start() {
            let snapshot = TimerSnapshot {
                mode: Mode::Focus,
                status: Status::Paused,
                cycle_count: 1,
                remaining_seconds: 100.0,
                total_seconds: 1800.0,
                fraction: 0.05,
                just_completed: false,
                has_started: true,
            };
            assert!(snapshot.is_stopped_after_start());
        }
    }
}
