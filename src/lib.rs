//! focusfield library
//!
//! This library provides the core of the focusfield interval timer.
//! It includes:
//! - Clock source with a manual test clock and suspension detection
//! - Timer state machine with deadline-based remaining time
//! - Audio engine service and cue scheduler with catch-up after suspension
//! - Duration store persisted as a small JSON settings file
//! - Controller connecting user intents and evaluation triggers
//! - CLI command parsing, display utilities and the interactive shell

pub mod cli;
pub mod clock;
pub mod controller;
pub mod sound;
pub mod store;
pub mod timer;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    format_clock, DurationSettings, Mode, RuntimeConfig, Status, TimerSnapshot,
    DEFAULT_BREAK_MINUTES, DEFAULT_FOCUS_MINUTES, MAX_MINUTES, MIN_MINUTES,
};

pub use clock::{Clock, ManualClock, SuspendDetector, SystemClock, Timestamp};

pub use controller::{Intent, TimerController};

pub use timer::{Session, TimerEvent, TimerMachine};

// Re-export sound types
pub use sound::{AudioEngine, Cue, CueScheduler, MockAudioEngine, RodioAudioEngine, SoundError};

// Re-export store types
pub use store::{
    normalize_minutes, DurationStore, JsonFileStore, KeyValueStore, MemoryStore, StoreError,
};
