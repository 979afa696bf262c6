//! Evaluation triggers and user intents.
//!
//! The controller connects the outside world to the [`TimerMachine`]:
//!
//! - User intents arrive through [`TimerController::dispatch`], which also
//!   tries to unlock audio and plays the control click
//! - [`TimerController::frame`] and [`TimerController::background_tick`]
//!   are evaluation triggers; their cadence never affects correctness
//! - [`TimerController::resume`] is the focus-regain path that delivers
//!   completion cues missed during suspension
//! - Duration edits go through the [`DurationStore`] and are pushed into
//!   the machine
//!
//! Intents flow in, immutable [`TimerSnapshot`]s flow out.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SuspendDetector};
use crate::sound::{AudioEngine, SoundError};
use crate::store::DurationStore;
use crate::timer::{TimerEvent, TimerMachine};
use crate::types::{Mode, RuntimeConfig, TimerSnapshot};

/// A user control action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// Toggle between running and paused
    PlayPause,
    Skip,
    Reset,
    /// Add the given number of seconds
    AddTime(f64),
}

/// Drives a [`TimerMachine`] from user intents and evaluation triggers.
pub struct TimerController<A> {
    machine: TimerMachine<A>,
    engine: Arc<A>,
    clock: Arc<dyn Clock>,
    store: DurationStore,
    detector: SuspendDetector,
    config: RuntimeConfig,
}

impl<A: AudioEngine> TimerController<A> {
    /// Creates a controller using the durations held by `store`.
    pub fn new(
        store: DurationStore,
        clock: Arc<dyn Clock>,
        engine: Arc<A>,
        config: RuntimeConfig,
    ) -> Self {
        if let Err(e) = engine.ensure() {
            warn!("Audio engine unavailable: {}", e);
        }
        let detector = SuspendDetector::new(clock.now(), Instant::now(), config.suspend_threshold);
        let machine = TimerMachine::new(store.settings(), Arc::clone(&clock), Arc::clone(&engine));

        Self {
            machine,
            engine,
            clock,
            store,
            detector,
            config,
        }
    }

    /// Publishes timer transitions on `event_tx`.
    #[must_use]
    pub fn with_events(mut self, event_tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        self.machine = self.machine.with_events(event_tx);
        self
    }

    /// Applies a user intent.
    ///
    /// The transition is applied first. Audio is then unlocked (bounded by
    /// the unlock timeout), cues armed while locked are re-armed, and the
    /// control click plays. Returns whether the transition applied.
    pub async fn dispatch(&mut self, intent: Intent) -> bool {
        let applied = match intent {
            Intent::PlayPause => self.machine.toggle(),
            Intent::Skip => self.machine.skip(),
            Intent::Reset => self.machine.reset(),
            Intent::AddTime(seconds) => self.machine.add_time(seconds),
        };
        debug!("Dispatched {:?} (applied: {})", intent, applied);

        if self.unlock_audio().await {
            self.machine.rearm();
        }
        self.machine.play_click();
        applied
    }

    /// Rendering-cadence trigger.
    pub fn frame(&mut self) -> TimerSnapshot {
        self.machine.poll();
        self.machine.snapshot()
    }

    /// Coarse background trigger.
    ///
    /// Keeps completion moving when frames are throttled, and runs the
    /// resume path when the wall clock jumped past `mono` (host suspension).
    pub async fn background_tick(&mut self, mono: Instant) -> TimerSnapshot {
        if let Some(gap) = self.detector.observe(self.clock.now(), mono) {
            info!("Host suspension detected ({:.1}s)", gap.as_secs_f64());
            self.resume().await;
        } else {
            self.machine.poll();
        }
        self.machine.snapshot()
    }

    /// Focus-regain path. Returns true when a missed chime was played.
    pub async fn resume(&mut self) -> bool {
        if self.unlock_audio().await {
            self.machine.rearm();
        }
        let caught_up = self.machine.on_resume();
        if caught_up {
            info!("Played missed completion cue");
        }
        caught_up
    }

    /// Applies a duration text edit and returns the resulting minutes.
    pub fn edit_duration(&mut self, mode: Mode, text: &str) -> u32 {
        let minutes = self.store.edit(mode, text);
        self.machine.set_settings(self.store.settings());
        minutes
    }

    pub fn set_muted(&self, muted: bool) {
        self.engine.set_muted(muted);
        debug!("Muted: {}", muted);
    }

    /// Flips the mute state and returns the new value.
    pub fn toggle_muted(&self) -> bool {
        let muted = !self.engine.is_muted();
        self.set_muted(muted);
        muted
    }

    pub fn is_muted(&self) -> bool {
        self.engine.is_muted()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.machine.snapshot()
    }

    pub fn machine(&self) -> &TimerMachine<A> {
        &self.machine
    }

    pub fn store(&self) -> &DurationStore {
        &self.store
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Attempts to unlock audio. Returns true when it became unlocked now.
    async fn unlock_audio(&self) -> bool {
        if self.engine.is_unlocked() {
            return false;
        }

        let limit = self.config.unlock_timeout;
        match tokio::time::timeout(limit, self.engine.unlock()).await {
            Ok(Ok(())) => {
                debug!("Audio unlocked");
                true
            }
            Ok(Err(e)) if e.is_retryable() => {
                debug!("Audio still locked: {}", e);
                false
            }
            Ok(Err(e)) => {
                warn!("{} ({})", e, e.suggestion());
                false
            }
            Err(_) => {
                let e = SoundError::UnlockTimeout(limit.as_millis() as u64);
                warn!("{} ({})", e, e.suggestion());
                false
            }
        }
    }
}

impl<A> std::fmt::Debug for TimerController<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerController")
            .field("machine", &self.machine)
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
