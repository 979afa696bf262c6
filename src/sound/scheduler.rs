//! Audio cue scheduler.
//!
//! Translates a wall-clock deadline and the mode that follows it into voices
//! anchored on the audio clock: a countdown of ticks over the final seconds
//! and a completion chime starting at the deadline. Cues never depend on how
//! often anything polls.
//!
//! # Supersession
//!
//! Arming replaces the current schedule. A schedule whose deadline is still
//! in the future is superseded and all of its voices are cancelled. A
//! schedule whose deadline has been reached belongs to a completed session;
//! it is retired instead, so a chime that is already sounding plays out.
//!
//! # Catch-up
//!
//! The audio clock stops while the host sleeps, so a chime scheduled before a
//! suspension may still be pending after the deadline has passed on the wall
//! clock. [`CueScheduler::catch_up`] replaces such a stale chime with one
//! played immediately. A single stored deadline marks the last delivered
//! completion cue, so each deadline yields at most one chime.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::{Clock, Timestamp};
use crate::types::Mode;

use super::cue::{Cue, CHIME_NOTE_SPACING};
use super::{AudioEngine, VoiceId};

/// Number of countdown ticks before a deadline, one per second.
pub const COUNTDOWN_TICKS: u32 = 5;

#[derive(Debug)]
struct Schedule {
    deadline: Timestamp,
    next: Mode,
    ticks: Vec<VoiceId>,
    chime: Vec<VoiceId>,
}

impl Schedule {
    fn new(deadline: Timestamp, next: Mode) -> Self {
        Self {
            deadline,
            next,
            ticks: Vec::new(),
            chime: Vec::new(),
        }
    }

    fn voices(&self) -> Vec<VoiceId> {
        self.ticks.iter().chain(&self.chime).copied().collect()
    }
}

/// Schedules countdown and completion cues for a deadline.
pub struct CueScheduler<A> {
    engine: Arc<A>,
    clock: Arc<dyn Clock>,
    armed: Option<Schedule>,
    retired: Option<Schedule>,
    delivered: Option<Timestamp>,
}

impl<A: AudioEngine> CueScheduler<A> {
    pub fn new(engine: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine,
            clock,
            armed: None,
            retired: None,
            delivered: None,
        }
    }

    /// Returns the deadline of the current schedule.
    pub fn armed_deadline(&self) -> Option<Timestamp> {
        self.armed.as_ref().map(|s| s.deadline)
    }

    /// Returns the last deadline whose completion cue was delivered.
    pub fn delivered_deadline(&self) -> Option<Timestamp> {
        self.delivered
    }

    /// Schedules cues for `deadline`, superseding the current schedule.
    ///
    /// When the audio engine is locked the deadline is still recorded, so
    /// catch-up can deliver its chime later.
    pub fn arm(&mut self, deadline: Timestamp, next: Mode) {
        let now = self.clock.now();

        if let Some(previous) = self.armed.take() {
            if previous.deadline <= now {
                self.retire(previous);
            } else {
                self.discard(previous);
            }
        }

        let mut schedule = Schedule::new(deadline, next);
        match self.engine.current_time() {
            Some(audio_now) => {
                let lead = now.seconds_until(deadline);
                for k in (1..=COUNTDOWN_TICKS).rev() {
                    let offset = lead - f64::from(k);
                    if offset > 0.0 {
                        schedule
                            .ticks
                            .extend(self.try_schedule(Cue::Tick, audio_now + offset));
                    }
                }
                schedule.chime = self.schedule_chime(next, audio_now + lead.max(0.0));
                debug!(
                    "Armed {} ticks and {} chime notes {:.3}s ahead",
                    schedule.ticks.len(),
                    schedule.chime.len(),
                    lead
                );
            }
            None => debug!("Audio locked; recorded deadline without cues"),
        }

        self.armed = Some(schedule);
    }

    /// Stops and discards every pending cue. Safe when nothing is scheduled.
    pub fn cancel(&mut self) {
        if let Some(schedule) = self.armed.take() {
            self.discard(schedule);
        }
        if let Some(schedule) = self.retired.take() {
            self.discard(schedule);
        }
    }

    /// Delivers a completion cue that was missed while suspended.
    ///
    /// Considers the most recent schedule whose deadline has passed. If its
    /// chime has not started on the audio clock, the stale voices are
    /// cancelled and the chime is played immediately. Returns true when a
    /// catch-up chime was issued.
    pub fn catch_up(&mut self) -> bool {
        let now = self.clock.now();

        let elapsed_armed = self.armed.as_ref().is_some_and(|s| s.deadline <= now);
        let slot = if elapsed_armed {
            &mut self.armed
        } else {
            &mut self.retired
        };
        let Some(mut schedule) = slot.take() else {
            return false;
        };

        let fired = self.deliver_if_missed(&mut schedule, now);

        if elapsed_armed {
            self.armed = Some(schedule);
        } else {
            self.retired = Some(schedule);
        }
        fired
    }

    /// Plays a cue right away, ignoring audio failures.
    pub fn play_now(&self, cue: Cue) {
        if let Err(e) = self.engine.play_now(cue) {
            debug!("Skipped {:?}: {}", cue, e);
        }
    }

    fn deliver_if_missed(&mut self, schedule: &mut Schedule, now: Timestamp) -> bool {
        if schedule.deadline > now || self.delivered == Some(schedule.deadline) {
            return false;
        }

        if let Some(&first) = schedule.chime.first() {
            if self.engine.has_started(first) {
                self.delivered = Some(schedule.deadline);
                return false;
            }
        }

        self.engine.cancel(&schedule.voices());
        schedule.ticks.clear();
        schedule.chime = match self.engine.current_time() {
            Some(audio_now) => self.schedule_chime(schedule.next, audio_now),
            None => Vec::new(),
        };
        self.delivered = Some(schedule.deadline);

        info!(
            "Delivered missed completion cue {:.1}s late",
            schedule.deadline.seconds_until(now)
        );
        !schedule.chime.is_empty()
    }

    fn retire(&mut self, schedule: Schedule) {
        if let Some(older) = self.retired.replace(schedule) {
            self.discard(older);
        }
    }

    fn discard(&self, schedule: Schedule) {
        self.engine.cancel(&schedule.voices());
    }

    fn schedule_chime(&self, next: Mode, start: f64) -> Vec<VoiceId> {
        Cue::chime(next)
            .enumerate()
            .filter_map(|(i, cue)| self.try_schedule(cue, start + i as f64 * CHIME_NOTE_SPACING))
            .collect()
    }

    fn try_schedule(&self, cue: Cue, at: f64) -> Option<VoiceId> {
        match self.engine.schedule(cue, at) {
            Ok(id) => Some(id),
            Err(e) if e.is_device_error() => {
                warn!("Failed to schedule {:?}: {}", cue, e);
                None
            }
            Err(e) => {
                debug!("Failed to schedule {:?}: {}", cue, e);
                None
            }
        }
    }
}

impl<A> std::fmt::Debug for CueScheduler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CueScheduler")
            .field("armed", &self.armed)
            .field("retired", &self.retired)
            .field("delivered", &self.delivered)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sound::cue::CHIME_NOTES;
    use crate::sound::MockAudioEngine;

    fn setup() -> (
        CueScheduler<MockAudioEngine>,
        Arc<MockAudioEngine>,
        Arc<ManualClock>,
    ) {
        let engine = Arc::new(MockAudioEngine::new());
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_000_000)));
        let scheduler = CueScheduler::new(Arc::clone(&engine), clock.clone() as Arc<dyn Clock>);
        (scheduler, engine, clock)
    }

    fn deadline_in(clock: &ManualClock, seconds: f64) -> Timestamp {
        clock.now().add_seconds(seconds)
    }

    mod arm_tests {
        use super::*;

        #[test]
        fn test_arm_schedules_ticks_and_chime() {
            let (mut scheduler, engine, clock) = setup();
            scheduler.arm(deadline_in(&clock, 60.0), Mode::Break);

            let voices = engine.voices();
            let ticks: Vec<_> = voices.iter().filter(|v| v.cue == Cue::Tick).collect();
            assert_eq!(ticks.len(), COUNTDOWN_TICKS as usize);
            assert_eq!(ticks[0].at, 55.0);
            assert_eq!(ticks[4].at, 59.0);

            let chime: Vec<_> = voices.iter().filter(|v| v.cue != Cue::Tick).collect();
            assert_eq!(chime.len(), CHIME_NOTES);
            assert_eq!(chime[0].at, 60.0);
            assert!((chime[6].at - (60.0 + 6.0 * CHIME_NOTE_SPACING)).abs() < 1e-9);
            assert_eq!(
                chime[0].cue,
                Cue::ChimeNote {
                    next: Mode::Break,
                    index: 0
                }
            );
        }

        #[test]
        fn test_arm_skips_ticks_already_past() {
            let (mut scheduler, engine, clock) = setup();
            scheduler.arm(deadline_in(&clock, 3.5), Mode::Focus);

            let ticks = engine.voices().iter().filter(|v| v.cue == Cue::Tick).count();
            assert_eq!(ticks, 3);
        }

        #[test]
        fn test_rearm_cancels_superseded_schedule() {
            let (mut scheduler, engine, clock) = setup();
            scheduler.arm(deadline_in(&clock, 60.0), Mode::Break);
            let first: Vec<_> = engine.voices().iter().map(|v| v.id).collect();

            scheduler.arm(deadline_in(&clock, 360.0), Mode::Break);

            let voices = engine.voices();
            assert!(voices
                .iter()
                .filter(|v| first.contains(&v.id))
                .all(|v| v.cancelled));
            assert_eq!(engine.pending().len(), COUNTDOWN_TICKS as usize + CHIME_NOTES);
            assert_eq!(
                scheduler.armed_deadline(),
                Some(deadline_in(&clock, 360.0))
            );
        }

        #[test]
        fn test_rearm_after_deadline_retires_instead_of_cancelling() {
            let (mut scheduler, engine, clock) = setup();
            let deadline = deadline_in(&clock, 10.0);
            scheduler.arm(deadline, Mode::Break);

            clock.advance_secs(10.0);
            engine.advance(10.0);
            scheduler.arm(deadline_in(&clock, 300.0), Mode::Focus);

            let old_chime_cancelled = engine
                .voices()
                .iter()
                .filter(|v| matches!(v.cue, Cue::ChimeNote { next: Mode::Break, .. }))
                .any(|v| v.cancelled);
            assert!(!old_chime_cancelled);
        }

        #[test]
        fn test_arm_while_locked_records_deadline() {
            let engine = Arc::new(MockAudioEngine::locked());
            let clock = Arc::new(ManualClock::new(Timestamp::from_millis(0)));
            let mut scheduler =
                CueScheduler::new(Arc::clone(&engine), clock.clone() as Arc<dyn Clock>);

            scheduler.arm(Timestamp::from_millis(60_000), Mode::Break);

            assert!(engine.voices().is_empty());
            assert_eq!(scheduler.armed_deadline(), Some(Timestamp::from_millis(60_000)));
        }
    }

    mod cancel_tests {
        use super::*;

        #[test]
        fn test_cancel_when_empty_is_safe() {
            let (mut scheduler, engine, _clock) = setup();
            scheduler.cancel();
            scheduler.cancel();
            assert!(engine.voices().is_empty());
        }

        #[test]
        fn test_cancel_discards_everything() {
            let (mut scheduler, engine, clock) = setup();
            scheduler.arm(deadline_in(&clock, 30.0), Mode::Break);
            scheduler.cancel();

            assert!(engine.pending().is_empty());
            assert_eq!(scheduler.armed_deadline(), None);
        }
    }

    mod catch_up_tests {
        use super::*;

        #[test]
        fn test_no_catch_up_before_deadline() {
            let (mut scheduler, engine, clock) = setup();
            scheduler.arm(deadline_in(&clock, 30.0), Mode::Break);

            clock.advance_secs(10.0);
            assert!(!scheduler.catch_up());
            assert_eq!(engine.completion_cues_delivered(), 0);
        }

        #[test]
        fn test_catch_up_after_suspension_fires_once() {
            let (mut scheduler, engine, clock) = setup();
            let deadline = deadline_in(&clock, 30.0);
            scheduler.arm(deadline, Mode::Break);

            // Wall clock moves on, audio clock stays behind
            clock.advance_secs(120.0);
            engine.advance(1.0);

            assert!(scheduler.catch_up());
            assert_eq!(scheduler.delivered_deadline(), Some(deadline));
            assert_eq!(engine.completion_cues_delivered(), 1);

            assert!(!scheduler.catch_up());
            engine.advance(100.0);
            assert_eq!(engine.completion_cues_delivered(), 1);
        }

        #[test]
        fn test_catch_up_skips_delivered_scheduled_chime() {
            let (mut scheduler, engine, clock) = setup();
            let deadline = deadline_in(&clock, 30.0);
            scheduler.arm(deadline, Mode::Focus);

            clock.advance_secs(31.0);
            engine.advance(31.0);

            assert!(!scheduler.catch_up());
            assert_eq!(scheduler.delivered_deadline(), Some(deadline));
            assert_eq!(engine.completion_cues_delivered(), 1);
        }

        #[test]
        fn test_catch_up_covers_retired_schedule() {
            let (mut scheduler, engine, clock) = setup();
            let deadline = deadline_in(&clock, 30.0);
            scheduler.arm(deadline, Mode::Break);

            clock.advance_secs(45.0);
            scheduler.arm(deadline_in(&clock, 300.0), Mode::Focus);

            assert!(scheduler.catch_up());
            assert_eq!(scheduler.delivered_deadline(), Some(deadline));
            assert_eq!(engine.completion_cues_delivered(), 1);
            assert!(!scheduler.catch_up());
        }

        #[test]
        fn test_catch_up_cancels_stale_voices() {
            let (mut scheduler, engine, clock) = setup();
            scheduler.arm(deadline_in(&clock, 30.0), Mode::Break);

            clock.advance_secs(60.0);
            scheduler.catch_up();

            let stale = engine
                .voices()
                .iter()
                .filter(|v| v.at >= 25.0)
                .all(|v| v.cancelled);
            assert!(stale);
        }

        #[test]
        fn test_catch_up_when_audio_unavailable_marks_delivered() {
            let engine = Arc::new(MockAudioEngine::locked());
            let clock = Arc::new(ManualClock::new(Timestamp::from_millis(0)));
            let mut scheduler =
                CueScheduler::new(Arc::clone(&engine), clock.clone() as Arc<dyn Clock>);

            scheduler.arm(Timestamp::from_millis(5_000), Mode::Break);
            clock.advance_secs(10.0);

            assert!(!scheduler.catch_up());
            assert_eq!(
                scheduler.delivered_deadline(),
                Some(Timestamp::from_millis(5_000))
            );
        }
    }
}
