//! Deadline-based timer state machine.
//!
//! Remaining time is never counted down. While running it is derived from the
//! deadline and the clock on every read, so the machine stays correct no
//! matter how rarely it is polled.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::clock::{Clock, Timestamp};
use crate::sound::{AudioEngine, Cue, CueScheduler};
use crate::types::{clamp01, DurationSettings, Mode, Status, TimerSnapshot, JUST_COMPLETED_PULSE};

use super::event::TimerEvent;

/// Remainders below this are replaced by the full duration on play.
pub const MIN_RESUME_SECONDS: f64 = 0.5;

// ============================================================================
// Session
// ============================================================================

/// The current timer instance.
///
/// `deadline` is authoritative while running and `paused_remaining` while
/// idle or paused; the other one is not consulted.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub mode: Mode,
    /// Starts at 1, incremented on every Break to Focus completion
    pub cycle_count: u32,
    /// Nominal length, used only for the display fraction
    pub total_seconds: f64,
    pub status: Status,
    /// Present iff running
    pub deadline: Option<Timestamp>,
    pub paused_remaining: f64,
}

impl Session {
    fn new(settings: &DurationSettings) -> Self {
        let total = settings.seconds_for(Mode::Focus);
        Self {
            mode: Mode::Focus,
            cycle_count: 1,
            total_seconds: total,
            status: Status::Idle,
            deadline: None,
            paused_remaining: total,
        }
    }

    /// Loads the configured duration of the current mode.
    fn restart(&mut self, settings: &DurationSettings) {
        self.total_seconds = settings.seconds_for(self.mode);
        self.paused_remaining = self.total_seconds;
    }
}

// ============================================================================
// TimerMachine
// ============================================================================

/// Timer state machine driving a [`CueScheduler`].
pub struct TimerMachine<A> {
    session: Session,
    settings: DurationSettings,
    has_started: bool,
    /// Last deadline whose auto-switch was applied
    completed_deadline: Option<Timestamp>,
    /// When the last auto-switch happened
    completed_at: Option<Timestamp>,
    clock: Arc<dyn Clock>,
    scheduler: CueScheduler<A>,
    event_tx: Option<mpsc::UnboundedSender<TimerEvent>>,
}

impl<A: AudioEngine> TimerMachine<A> {
    /// Creates an idle machine in focus mode.
    pub fn new(settings: DurationSettings, clock: Arc<dyn Clock>, engine: Arc<A>) -> Self {
        Self {
            session: Session::new(&settings),
            settings,
            has_started: false,
            completed_deadline: None,
            completed_at: None,
            scheduler: CueScheduler::new(engine, Arc::clone(&clock)),
            clock,
            event_tx: None,
        }
    }

    /// Publishes transitions on `event_tx`.
    #[must_use]
    pub fn with_events(mut self, event_tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Starts or resumes the countdown. Returns false if already running.
    pub fn play(&mut self) -> bool {
        if self.session.status.is_running() {
            debug!("play ignored: already running");
            return false;
        }

        let mut remaining = self.session.paused_remaining;
        if remaining.is_nan() || remaining < MIN_RESUME_SECONDS {
            remaining = self.settings.seconds_for(self.session.mode);
            self.session.total_seconds = remaining;
            debug!("Degenerate remainder, restarting with {}s", remaining);
        }

        let deadline = self.clock.now().add_seconds(remaining);
        self.session.deadline = Some(deadline);
        self.session.status = Status::Running;
        self.has_started = true;
        self.scheduler.arm(deadline, self.session.mode.next());

        info!("Started {} with {:.1}s left", self.session.mode.as_str(), remaining);
        self.emit(TimerEvent::Started {
            mode: self.session.mode,
            remaining_seconds: remaining,
        });
        true
    }

    /// Freezes the remaining time. Returns false if not running.
    pub fn pause(&mut self) -> bool {
        if !self.session.status.is_running() {
            debug!("pause ignored: not running");
            return false;
        }
        // A deadline that passed unobserved completes before pausing
        self.poll();

        let remaining = self.remaining();
        self.session.paused_remaining = remaining;
        self.session.deadline = None;
        self.session.status = Status::Paused;
        self.scheduler.cancel();

        info!("Paused {} with {:.1}s left", self.session.mode.as_str(), remaining);
        self.emit(TimerEvent::Paused {
            mode: self.session.mode,
            remaining_seconds: remaining,
        });
        true
    }

    /// Pauses when running, plays otherwise.
    pub fn toggle(&mut self) -> bool {
        if self.session.status.is_running() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Switches to the other mode and stops. Never increments the cycle.
    pub fn skip(&mut self) -> bool {
        self.scheduler.cancel();
        self.session.mode = self.session.mode.next();
        self.session.restart(&self.settings);
        self.session.deadline = None;
        self.session.status = Status::Idle;
        self.completed_at = None;

        info!("Skipped to {}", self.session.mode.as_str());
        self.emit(TimerEvent::Skipped {
            mode: self.session.mode,
        });
        true
    }

    /// Restarts the current mode from its configured duration and stops.
    pub fn reset(&mut self) -> bool {
        self.scheduler.cancel();
        self.session.restart(&self.settings);
        self.session.deadline = None;
        self.session.status = Status::Idle;

        info!("Reset {}", self.session.mode.as_str());
        self.emit(TimerEvent::Reset {
            mode: self.session.mode,
        });
        true
    }

    /// Adds time to the current session.
    ///
    /// Returns false for non-positive or non-finite amounts.
    pub fn add_time(&mut self, seconds: f64) -> bool {
        if !seconds.is_finite() || seconds <= 0.0 {
            debug!("add_time ignored: {}", seconds);
            return false;
        }

        if self.session.status.is_running() {
            self.poll();
        }

        self.session.total_seconds += seconds;
        match self.session.deadline {
            Some(deadline) if self.session.status.is_running() => {
                let extended = deadline.add_seconds(seconds);
                self.session.deadline = Some(extended);
                self.scheduler.arm(extended, self.session.mode.next());
            }
            _ => self.session.paused_remaining += seconds,
        }

        info!("Added {:.0}s", seconds);
        self.emit(TimerEvent::TimeAdded {
            seconds,
            total_seconds: self.session.total_seconds,
        });
        true
    }

    /// Applies the automatic mode switch if the deadline has elapsed.
    ///
    /// Safe to call at any cadence. Each deadline switches at most once.
    /// Returns true when a switch happened.
    pub fn poll(&mut self) -> bool {
        let Some(deadline) = self.session.deadline else {
            return false;
        };
        let now = self.clock.now();
        if !self.session.status.is_running()
            || deadline > now
            || self.completed_deadline == Some(deadline)
        {
            return false;
        }

        self.completed_deadline = Some(deadline);
        self.completed_at = Some(now);

        let finished = self.session.mode;
        self.session.mode = finished.next();
        if self.session.mode == Mode::Focus {
            self.session.cycle_count += 1;
        }
        self.session.restart(&self.settings);

        let next_deadline = now.add_seconds(self.session.total_seconds);
        self.session.deadline = Some(next_deadline);
        self.scheduler.arm(next_deadline, self.session.mode.next());

        info!(
            "Completed {} ({:.1}s late), now {} cycle {}",
            finished.as_str(),
            deadline.seconds_until(now),
            self.session.mode.as_str(),
            self.session.cycle_count
        );
        self.emit(TimerEvent::Completed {
            finished,
            next: self.session.mode,
            cycle_count: self.session.cycle_count,
        });
        true
    }

    /// Handles a focus-regain or wake-from-suspension signal.
    ///
    /// Applies any pending completion, then delivers a completion cue that
    /// was missed while the audio clock was suspended. Cues for a deadline
    /// still ahead are re-anchored, since the audio clock fell behind the
    /// wall clock by the length of the suspension. Returns true when a
    /// catch-up cue was played.
    pub fn on_resume(&mut self) -> bool {
        self.poll();
        let caught_up = self.scheduler.catch_up();
        if caught_up {
            if let Some(deadline) = self.scheduler.delivered_deadline() {
                self.emit(TimerEvent::CueCaughtUp { deadline });
            }
        }
        if self.remaining() > 0.0 {
            self.rearm();
        }
        caught_up
    }

    /// Replaces the configured durations.
    ///
    /// When not running and the active mode's duration changed, the session
    /// is restarted from the new duration. Returns true in that case.
    pub fn set_settings(&mut self, settings: DurationSettings) -> bool {
        let mode = self.session.mode;
        let changed = self.settings.minutes_for(mode) != settings.minutes_for(mode);
        self.settings = settings;

        if changed && !self.session.status.is_running() {
            self.session.restart(&self.settings);
            debug!(
                "Duration of {} changed to {}s",
                mode.as_str(),
                self.session.total_seconds
            );
            return true;
        }
        false
    }

    /// Re-schedules cues for the current deadline.
    ///
    /// Used once audio becomes available after the deadline was armed while
    /// locked, and after a suspension. Returns false when not running.
    pub fn rearm(&mut self) -> bool {
        match self.session.deadline {
            Some(deadline) if self.session.status.is_running() => {
                self.scheduler.arm(deadline, self.session.mode.next());
                true
            }
            _ => false,
        }
    }

    /// Plays the control click, ignoring audio failures.
    pub fn play_click(&self) {
        self.scheduler.play_now(Cue::Click);
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Remaining seconds, never negative.
    pub fn remaining(&self) -> f64 {
        match self.session.deadline {
            Some(deadline) if self.session.status.is_running() => {
                self.clock.now().seconds_until(deadline).max(0.0)
            }
            _ => self.session.paused_remaining.max(0.0),
        }
    }

    /// Remaining fraction of the nominal session length, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.session.total_seconds > 0.0 {
            clamp01(self.remaining() / self.session.total_seconds)
        } else {
            0.0
        }
    }

    /// True for a short while after an automatic mode switch.
    pub fn just_completed(&self) -> bool {
        let pulse = JUST_COMPLETED_PULSE.as_secs_f64();
        self.completed_at
            .is_some_and(|at| at.seconds_until(self.clock.now()) < pulse)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.session.mode,
            status: self.session.status,
            cycle_count: self.session.cycle_count,
            remaining_seconds: self.remaining(),
            total_seconds: self.session.total_seconds,
            fraction: self.fraction(),
            just_completed: self.just_completed(),
            has_started: self.has_started,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> DurationSettings {
        self.settings
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    /// Last deadline whose auto-switch was applied.
    pub fn completed_deadline(&self) -> Option<Timestamp> {
        self.completed_deadline
    }

    pub fn scheduler(&self) -> &CueScheduler<A> {
        &self.scheduler
    }

    fn emit(&self, event: TimerEvent) {
        if let Some(tx) = &self.event_tx {
            if tx.send(event).is_err() {
                debug!("Timer event receiver dropped");
            }
        }
    }
}

impl<A> std::fmt::Debug for TimerMachine<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerMachine")
            .field("session", &self.session)
            .field("settings", &self.settings)
            .field("has_started", &self.has_started)
            .field("completed_deadline", &self.completed_deadline)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
