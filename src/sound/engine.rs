//! Audio engine backed by rodio.
//!
//! rodio output streams are not `Send`, so the stream and every playing
//! `Sink` live on a dedicated audio thread. The handle talks to it over a
//! command channel. The thread is spawned lazily by `ensure`, and the output
//! device is opened by `unlock`.
//!
//! The audio clock is a monotonic `Instant` anchored when the output stream
//! opens. Like the sample clock of the device, it does not advance while the
//! host sleeps, which is why it can drift behind the wall clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::cue::Cue;
use super::error::SoundError;
use super::voice::Voice;
use super::{AudioEngine, VoiceId};

/// Master volume applied to every voice when not muted.
pub const MASTER_VOLUME: f32 = 0.6;

/// How often the audio thread drops finished sinks when idle.
const PRUNE_INTERVAL: Duration = Duration::from_secs(1);

/// Voices that started this long ago are no longer tracked.
const START_RETENTION_SECS: f64 = 60.0;

enum AudioCommand {
    Open {
        reply: oneshot::Sender<Result<(), SoundError>>,
    },
    Schedule {
        id: VoiceId,
        cue: Cue,
        delay: Duration,
    },
    Cancel(Vec<VoiceId>),
    SetMuted(bool),
}

/// State shared between the handle and the audio thread.
#[derive(Debug, Default)]
struct Shared {
    /// Set once the output stream is open; anchors the audio clock
    epoch: OnceLock<Instant>,
    muted: AtomicBool,
}

impl Shared {
    fn volume(&self) -> f32 {
        if self.muted.load(Ordering::Relaxed) {
            0.0
        } else {
            MASTER_VOLUME
        }
    }
}

/// Process-wide audio engine handle.
pub struct RodioAudioEngine {
    tx: Mutex<Option<Sender<AudioCommand>>>,
    shared: Arc<Shared>,
    next_id: AtomicU64,
    /// Audio-clock start time of each tracked voice
    starts: Mutex<HashMap<VoiceId, f64>>,
}

impl RodioAudioEngine {
    /// Creates an engine handle without touching audio hardware.
    #[must_use]
    pub fn new(muted: bool) -> Self {
        let shared = Shared::default();
        shared.muted.store(muted, Ordering::Relaxed);
        Self {
            tx: Mutex::new(None),
            shared: Arc::new(shared),
            next_id: AtomicU64::new(1),
            starts: Mutex::new(HashMap::new()),
        }
    }

    fn sender(&self) -> Result<Sender<AudioCommand>, SoundError> {
        self.ensure()?;
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| SoundError::StreamError("audio thread is not running".to_string()))
    }

    fn send(&self, command: AudioCommand) -> Result<(), SoundError> {
        self.sender()?
            .send(command)
            .map_err(|_| SoundError::StreamError("audio thread stopped".to_string()))
    }
}

impl Default for RodioAudioEngine {
    fn default() -> Self {
        Self::new(false)
    }
}

impl std::fmt::Debug for RodioAudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioAudioEngine")
            .field("unlocked", &self.is_unlocked())
            .field("muted", &self.is_muted())
            .finish_non_exhaustive()
    }
}

impl AudioEngine for RodioAudioEngine {
    fn ensure(&self) -> Result<(), SoundError> {
        let mut tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if tx.is_some() {
            return Ok(());
        }

        let (sender, receiver) = unbounded::<AudioCommand>();
        let shared = Arc::clone(&self.shared);
        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || run_audio_thread(receiver, shared))
            .map_err(|e| SoundError::StreamError(e.to_string()))?;

        debug!("Audio thread spawned");
        *tx = Some(sender);
        Ok(())
    }

    async fn unlock(&self) -> Result<(), SoundError> {
        if self.is_unlocked() {
            return Ok(());
        }

        let (reply, response) = oneshot::channel();
        self.send(AudioCommand::Open { reply })?;
        response
            .await
            .map_err(|_| SoundError::StreamError("audio thread dropped the unlock reply".to_string()))?
    }

    fn is_unlocked(&self) -> bool {
        self.shared.epoch.get().is_some()
    }

    fn set_muted(&self, muted: bool) {
        self.shared.muted.store(muted, Ordering::Relaxed);
        if self.is_unlocked() {
            if let Err(e) = self.send(AudioCommand::SetMuted(muted)) {
                debug!("Failed to forward mute state: {}", e);
            }
        }
    }

    fn is_muted(&self) -> bool {
        self.shared.muted.load(Ordering::Relaxed)
    }

    fn current_time(&self) -> Option<f64> {
        self.shared
            .epoch
            .get()
            .map(|epoch| epoch.elapsed().as_secs_f64())
    }

    fn schedule(&self, cue: Cue, at: f64) -> Result<VoiceId, SoundError> {
        let now = self.current_time().ok_or(SoundError::Locked)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let delay = Duration::from_secs_f64((at - now).max(0.0));

        {
            let mut starts = self.starts.lock().unwrap_or_else(PoisonError::into_inner);
            starts.retain(|_, start| *start >= now - START_RETENTION_SECS);
            starts.insert(id, at.max(now));
        }

        self.send(AudioCommand::Schedule { id, cue, delay })?;
        Ok(id)
    }

    fn has_started(&self, voice: VoiceId) -> bool {
        let Some(now) = self.current_time() else {
            return false;
        };
        self.starts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&voice)
            // Untracked voices are either long finished or were never issued
            .map_or(voice < self.next_id.load(Ordering::Relaxed), |start| now >= *start)
    }

    fn cancel(&self, voices: &[VoiceId]) {
        if voices.is_empty() {
            return;
        }
        {
            let mut starts = self.starts.lock().unwrap_or_else(PoisonError::into_inner);
            for id in voices {
                starts.remove(id);
            }
        }
        if let Err(e) = self.send(AudioCommand::Cancel(voices.to_vec())) {
            debug!("Failed to cancel voices: {}", e);
        }
    }
}

// ============================================================================
// Audio thread
// ============================================================================

fn run_audio_thread(receiver: crossbeam_channel::Receiver<AudioCommand>, shared: Arc<Shared>) {
    let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
    let mut voices: HashMap<VoiceId, Sink> = HashMap::new();

    loop {
        match receiver.recv_timeout(PRUNE_INTERVAL) {
            Ok(AudioCommand::Open { reply }) => {
                let result = if output.is_some() {
                    Ok(())
                } else {
                    match OutputStream::try_default() {
                        Ok(stream) => {
                            shared.epoch.get_or_init(Instant::now);
                            output = Some(stream);
                            debug!("Audio output stream opened");
                            Ok(())
                        }
                        Err(e) => Err(SoundError::DeviceNotAvailable(e.to_string())),
                    }
                };
                let _ = reply.send(result);
            }
            Ok(AudioCommand::Schedule { id, cue, delay }) => {
                let Some((_, handle)) = output.as_ref() else {
                    debug!("Output stream not open, dropping voice {}", id);
                    continue;
                };
                match Sink::try_new(handle) {
                    Ok(sink) => {
                        let tone = cue.tone();
                        sink.set_volume(shared.volume());
                        sink.append(Voice::new(tone).low_pass(tone.lowpass_hz).delay(delay));
                        voices.insert(id, sink);
                    }
                    Err(e) => {
                        let e = SoundError::PlaybackError(e.to_string());
                        warn!("{:?}: {} ({})", cue, e, e.suggestion());
                    }
                }
            }
            Ok(AudioCommand::Cancel(ids)) => {
                for id in ids {
                    if let Some(sink) = voices.remove(&id) {
                        sink.stop();
                    }
                }
            }
            Ok(AudioCommand::SetMuted(_)) => {
                let volume = shared.volume();
                for sink in voices.values() {
                    sink.set_volume(volume);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        voices.retain(|_, sink| !sink.empty());
    }

    debug!("Audio thread exiting");
}
