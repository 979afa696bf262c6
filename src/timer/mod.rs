//! Timer state machine.
//!
//! This module provides the core timer functionality:
//! - State transitions (play, pause, skip, reset, add time)
//! - Deadline-based remaining time that survives throttled polling
//! - Idempotent automatic mode switching on completion
//! - Cue scheduling and catch-up after suspension
//! - Event publishing for external observers

mod event;
mod machine;

pub use event::TimerEvent;
pub use machine::{Session, TimerMachine, MIN_RESUME_SECONDS};
