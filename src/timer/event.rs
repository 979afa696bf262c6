//! Timer events for observers of the state machine.

use crate::clock::Timestamp;
use crate::types::Mode;

/// Transitions published by [`TimerMachine`](super::TimerMachine).
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    /// Countdown started or resumed
    Started {
        mode: Mode,
        /// Seconds until the new deadline
        remaining_seconds: f64,
    },
    /// Countdown paused
    Paused {
        mode: Mode,
        remaining_seconds: f64,
    },
    /// Mode switched manually; the timer is idle
    Skipped {
        /// Mode after the skip
        mode: Mode,
    },
    /// Current mode restarted from its configured duration
    Reset { mode: Mode },
    /// Time added to the current session
    TimeAdded {
        seconds: f64,
        total_seconds: f64,
    },
    /// Deadline reached; the timer switched mode automatically
    Completed {
        finished: Mode,
        next: Mode,
        cycle_count: u32,
    },
    /// A completion cue missed during suspension was played late
    CueCaughtUp { deadline: Timestamp },
}
