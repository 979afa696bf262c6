//! Audio cues for the focus timer.
//!
//! This module provides:
//!
//! - An injectable audio engine service with an explicit lifecycle
//!   (`ensure` / `unlock` / `set_muted`)
//! - A rodio-backed engine running on a dedicated audio thread
//! - Synthesized tick, click and chime cues
//! - The cue scheduler that anchors cues to the audio clock
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  arm / cancel / catch_up
//! │   TimerMachine   │──────────────┐
//! └──────────────────┘              ▼
//!                        ┌──────────────────┐
//!                        │   CueScheduler   │
//!                        └────────┬─────────┘
//!                                 │ schedule(cue, audio time)
//!                                 ▼
//!                        ┌──────────────────┐     ┌──────────────────┐
//!                        │   AudioEngine    │────▶│   audio thread   │
//!                        │  (rodio / mock)  │     │  (Sink per voice)│
//!                        └──────────────────┘     └──────────────────┘
//! ```
//!
//! # Graceful degradation
//!
//! Before `unlock` succeeds, or on hosts without an output device, every
//! scheduling call fails softly and the scheduler carries on without sound.

mod cue;
mod engine;
mod error;
mod scheduler;
mod voice;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

pub use cue::{chime_frequencies, Cue, Tone, Waveform, CHIME_NOTES, CHIME_NOTE_SPACING};
pub use engine::{RodioAudioEngine, MASTER_VOLUME};
pub use error::SoundError;
pub use scheduler::{CueScheduler, COUNTDOWN_TICKS};
pub use voice::{Voice, SAMPLE_RATE};

/// Identifier of a scheduled voice.
pub type VoiceId = u64;

/// Audio engine service.
///
/// Times passed to `schedule` are on the engine's own audio clock, as
/// returned by `current_time`, not on the wall clock.
#[allow(async_fn_in_trait)]
pub trait AudioEngine {
    /// Lazily constructs the engine. Does not open the output device.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be constructed.
    fn ensure(&self) -> Result<(), SoundError>;

    /// Opens the output device so cues can be heard.
    ///
    /// # Errors
    ///
    /// Returns an error if no device is available.
    async fn unlock(&self) -> Result<(), SoundError>;

    /// Returns true once `unlock` has succeeded.
    fn is_unlocked(&self) -> bool;

    fn set_muted(&self, muted: bool);

    fn is_muted(&self) -> bool;

    /// Current audio-clock time in seconds, `None` while locked.
    fn current_time(&self) -> Option<f64>;

    /// Schedules `cue` to start at audio time `at`.
    ///
    /// Times in the past start immediately.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::Locked` before unlock, or a device error.
    fn schedule(&self, cue: Cue, at: f64) -> Result<VoiceId, SoundError>;

    /// Plays `cue` immediately.
    ///
    /// # Errors
    ///
    /// Same as [`AudioEngine::schedule`].
    fn play_now(&self, cue: Cue) -> Result<VoiceId, SoundError> {
        let now = self.current_time().ok_or(SoundError::Locked)?;
        self.schedule(cue, now)
    }

    /// Returns true once the voice has reached its start time.
    fn has_started(&self, voice: VoiceId) -> bool;

    /// Stops the given voices. Unknown or finished voices are ignored.
    fn cancel(&self, voices: &[VoiceId]);
}

// ============================================================================
// MockAudioEngine
// ============================================================================

/// A voice recorded by [`MockAudioEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledVoice {
    pub id: VoiceId,
    pub cue: Cue,
    pub at: f64,
    pub cancelled: bool,
}

/// Mock audio engine for testing.
///
/// Keeps a manually advanced audio clock. A voice counts as delivered once
/// the clock reaches its start time without it being cancelled, so tests
/// simulate suspension by advancing the wall clock alone.
#[derive(Debug)]
pub struct MockAudioEngine {
    time: Mutex<f64>,
    available: AtomicBool,
    unlocked: AtomicBool,
    muted: AtomicBool,
    unlock_calls: AtomicUsize,
    next_id: AtomicU64,
    voices: Mutex<Vec<ScheduledVoice>>,
}

impl Default for MockAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAudioEngine {
    /// Creates an unlocked engine at audio time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            time: Mutex::new(0.0),
            available: AtomicBool::new(true),
            unlocked: AtomicBool::new(true),
            muted: AtomicBool::new(false),
            unlock_calls: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
            voices: Mutex::new(Vec::new()),
        }
    }

    /// Creates an engine that needs `unlock` before it plays anything.
    #[must_use]
    pub fn locked() -> Self {
        let engine = Self::new();
        engine.unlocked.store(false, Ordering::SeqCst);
        engine
    }

    /// Creates an engine whose `unlock` always fails.
    #[must_use]
    pub fn unavailable() -> Self {
        let engine = Self::locked();
        engine.available.store(false, Ordering::SeqCst);
        engine
    }

    /// Advances the audio clock.
    pub fn advance(&self, seconds: f64) {
        *self.time.lock().unwrap() += seconds;
    }

    #[must_use]
    pub fn time(&self) -> f64 {
        *self.time.lock().unwrap()
    }

    #[must_use]
    pub fn voices(&self) -> Vec<ScheduledVoice> {
        self.voices.lock().unwrap().clone()
    }

    /// Voices that reached their start time and were not cancelled.
    #[must_use]
    pub fn delivered(&self) -> Vec<ScheduledVoice> {
        let now = self.time();
        self.voices()
            .into_iter()
            .filter(|v| !v.cancelled && v.at <= now)
            .collect()
    }

    /// Voices still waiting for their start time.
    #[must_use]
    pub fn pending(&self) -> Vec<ScheduledVoice> {
        let now = self.time();
        self.voices()
            .into_iter()
            .filter(|v| !v.cancelled && v.at > now)
            .collect()
    }

    /// Number of completion chimes that have started.
    #[must_use]
    pub fn completion_cues_delivered(&self) -> usize {
        self.delivered()
            .iter()
            .filter(|v| v.cue.is_chime_start())
            .count()
    }

    /// Number of delivered voices carrying `cue`.
    #[must_use]
    pub fn delivered_count(&self, cue: Cue) -> usize {
        self.delivered().iter().filter(|v| v.cue == cue).count()
    }

    #[must_use]
    pub fn unlock_count(&self) -> usize {
        self.unlock_calls.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.voices.lock().unwrap().clear();
    }
}

impl AudioEngine for MockAudioEngine {
    fn ensure(&self) -> Result<(), SoundError> {
        Ok(())
    }

    async fn unlock(&self) -> Result<(), SoundError> {
        self.unlock_calls.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(SoundError::DeviceNotAvailable("mock device".to_string()));
        }
        self.unlocked.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn current_time(&self) -> Option<f64> {
        self.is_unlocked().then(|| self.time())
    }

    fn schedule(&self, cue: Cue, at: f64) -> Result<VoiceId, SoundError> {
        let now = self.current_time().ok_or(SoundError::Locked)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.voices.lock().unwrap().push(ScheduledVoice {
            id,
            cue,
            at: at.max(now),
            cancelled: false,
        });
        Ok(id)
    }

    fn has_started(&self, voice: VoiceId) -> bool {
        let now = self.time();
        self.voices
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.id == voice)
            .is_some_and(|v| !v.cancelled && v.at <= now)
    }

    fn cancel(&self, voices: &[VoiceId]) {
        let mut recorded = self.voices.lock().unwrap();
        for voice in recorded.iter_mut().filter(|v| voices.contains(&v.id)) {
            voice.cancelled = true;
        }
    }
}
