//! Oscillator voice rendered as a rodio [`Source`].

use std::f32::consts::{PI, TAU};
use std::time::Duration;

use rodio::Source;

use super::cue::{Tone, Waveform};

/// Output sample rate of synthesized voices.
pub const SAMPLE_RATE: u32 = 44_100;

/// A finite mono voice synthesized from a [`Tone`].
#[derive(Debug, Clone)]
pub struct Voice {
    tone: Tone,
    position: u64,
    total_samples: u64,
    phase: f32,
}

impl Voice {
    #[must_use]
    pub fn new(tone: Tone) -> Self {
        let total_samples = (tone.length() * SAMPLE_RATE as f32).ceil() as u64;
        Self {
            tone,
            position: 0,
            total_samples,
            phase: 0.0,
        }
    }

    fn oscillate(&self) -> f32 {
        match self.tone.waveform {
            Waveform::Sine => self.phase.sin(),
            // Triangle from the arcsine of a sine keeps the phase accumulator shared
            Waveform::Triangle => (2.0 / PI) * self.phase.sin().asin(),
        }
    }
}

impl Iterator for Voice {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.total_samples {
            return None;
        }

        let t = self.position as f32 / SAMPLE_RATE as f32;
        let sample = self.oscillate() * self.tone.gain_at(t);

        self.phase = (self.phase + TAU * self.tone.frequency_at(t) / SAMPLE_RATE as f32) % TAU;
        self.position += 1;

        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_samples.saturating_sub(self.position) as usize;
        (remaining, Some(remaining))
    }
}

impl Source for Voice {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples.saturating_sub(self.position) as usize)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(self.tone.length()))
    }
}
