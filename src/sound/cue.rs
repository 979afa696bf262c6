//! Cue catalog and tone parameters.
//!
//! A [`Cue`] is the payload of a scheduled audio event. Each cue renders to a
//! [`Tone`]: an oscillator with an attack/decay/release envelope, an optional
//! frequency sweep, and a low-pass cutoff.

use crate::types::Mode;

/// Base frequency of the completion chime.
const CHIME_BASE_HZ: f32 = 660.0;

/// Interval ratios of the chime arpeggio.
const CHIME_RATIOS: [f32; 4] = [1.0, 1.25, 1.5, 2.0];

/// Per-note peak gain of the chime; later notes fade out.
const CHIME_PEAKS: [f32; CHIME_NOTES] = [0.5, 0.5, 0.5, 0.3, 0.3, 0.3, 0.15];

/// Number of notes in the completion chime.
pub const CHIME_NOTES: usize = 7;

/// Spacing between chime notes in seconds.
pub const CHIME_NOTE_SPACING: f64 = 0.18;

/// Oscillator shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
}

/// Synthesis parameters for a single voice.
///
/// Times are in seconds, frequencies in hertz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub waveform: Waveform,
    pub frequency: f32,
    pub attack: f32,
    pub decay: f32,
    pub release: f32,
    pub peak: f32,
    /// Frequency offset reached at the end of the decay stage
    pub sweep: f32,
    pub lowpass_hz: u32,
}

impl Default for Tone {
    fn default() -> Self {
        Self {
            waveform: Waveform::Triangle,
            frequency: 440.0,
            attack: 0.003,
            decay: 0.12,
            release: 0.06,
            peak: 0.8,
            sweep: 0.0,
            lowpass_hz: 9000,
        }
    }
}

/// Envelope floor reached at the end of the decay stage.
const DECAY_FLOOR: f32 = 0.001;

/// Envelope floor reached at the end of the release stage.
const RELEASE_FLOOR: f32 = 0.0005;

/// Silence appended after the release so the oscillator stops cleanly.
const TAIL: f32 = 0.02;

impl Tone {
    /// Total length of the voice in seconds.
    pub fn length(&self) -> f32 {
        self.attack + self.decay + self.release + TAIL
    }

    /// Envelope gain at `t` seconds after the voice starts.
    ///
    /// Linear attack to `peak`, exponential decay to a floor, then an
    /// exponential release to silence.
    pub fn gain_at(&self, t: f32) -> f32 {
        if t < 0.0 {
            return 0.0;
        }
        if t < self.attack {
            return self.peak * t / self.attack;
        }

        let decay_start = self.peak.max(DECAY_FLOOR);
        let t = t - self.attack;
        if t < self.decay {
            return exp_ramp(decay_start, DECAY_FLOOR, t / self.decay);
        }

        let t = t - self.decay;
        if t < self.release {
            return exp_ramp(DECAY_FLOOR, RELEASE_FLOOR, t / self.release);
        }
        0.0
    }

    /// Oscillator frequency at `t`, sweeping linearly until the decay ends.
    pub fn frequency_at(&self, t: f32) -> f32 {
        let sweep_end = self.attack + self.decay;
        if self.sweep == 0.0 || sweep_end <= 0.0 {
            return self.frequency;
        }
        self.frequency + self.sweep * (t / sweep_end).clamp(0.0, 1.0)
    }
}

fn exp_ramp(from: f32, to: f32, progress: f32) -> f32 {
    from * (to / from).powf(progress.clamp(0.0, 1.0))
}

// ============================================================================
// Cue
// ============================================================================

/// Payload of a scheduled audio event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// One beep of the final-seconds countdown
    Tick,
    /// Feedback for a user control action
    Click,
    /// One note of the completion chime announcing `next`
    ChimeNote { next: Mode, index: usize },
}

impl Cue {
    /// Returns the full chime sequence announcing `next`.
    pub fn chime(next: Mode) -> impl Iterator<Item = Cue> {
        (0..CHIME_NOTES).map(move |index| Cue::ChimeNote { next, index })
    }

    /// Returns true for the note that opens a completion chime.
    pub fn is_chime_start(&self) -> bool {
        matches!(self, Cue::ChimeNote { index: 0, .. })
    }

    /// Renders the cue into synthesis parameters.
    pub fn tone(&self) -> Tone {
        match *self {
            Cue::Tick => Tone {
                waveform: Waveform::Sine,
                frequency: 1000.0,
                attack: 0.002,
                decay: 0.05,
                release: 0.02,
                peak: 0.12,
                lowpass_hz: 2000,
                ..Tone::default()
            },
            Cue::Click => Tone {
                waveform: Waveform::Sine,
                frequency: 600.0,
                attack: 0.002,
                decay: 0.05,
                release: 0.02,
                peak: 0.15,
                lowpass_hz: 1500,
                ..Tone::default()
            },
            Cue::ChimeNote { next, index } => {
                let index = index.min(CHIME_NOTES - 1);
                Tone {
                    waveform: Waveform::Sine,
                    frequency: chime_frequencies(next)[index],
                    decay: 0.15,
                    release: 0.15,
                    peak: CHIME_PEAKS[index],
                    ..Tone::default()
                }
            }
        }
    }
}

/// Note frequencies of the completion chime.
///
/// Heading into a break the arpeggio climbs and settles back down; heading
/// into focus it is mirrored, falling first and climbing back up.
pub fn chime_frequencies(next: Mode) -> [f32; CHIME_NOTES] {
    let base = CHIME_RATIOS.map(|r| CHIME_BASE_HZ * r);
    match next {
        Mode::Break => [base[0], base[1], base[2], base[3], base[2], base[1], base[0]],
        Mode::Focus => [base[3], base[2], base[1], base[0], base[1], base[2], base[3]],
    }
}
