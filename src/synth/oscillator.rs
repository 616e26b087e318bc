//! Phase-accumulator oscillators.
//!
//! Phase runs over 0.0..1.0 and output is in -1.0..=1.0.

use crate::instrument::Waveform;
use std::f64::consts::TAU;

#[derive(Debug, Clone)]
pub struct Oscillator {
    phase: f64,
    waveform: Waveform,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            phase: 0.0,
            waveform,
        }
    }

    /// Next sample at `freq` Hz.
    pub fn next_sample(&mut self, freq: f64, sample_rate: f64) -> f64 {
        self.next_sample_pm(freq, sample_rate, 0.0)
    }

    /// Next sample with `phase_mod` (in cycles) added to the phase. Used for
    /// FM voices.
    pub fn next_sample_pm(&mut self, freq: f64, sample_rate: f64, phase_mod: f64) -> f64 {
        let out = shape(self.waveform, (self.phase + phase_mod).rem_euclid(1.0));
        self.phase = (self.phase + freq / sample_rate).rem_euclid(1.0);
        out
    }
}

fn shape(waveform: Waveform, phase: f64) -> f64 {
    match waveform {
        Waveform::Sine => (phase * TAU).sin(),
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Triangle => {
            if phase < 0.5 {
                4.0 * phase - 1.0
            } else {
                3.0 - 4.0 * phase
            }
        }
    }
}

/// Deterministic white noise (xorshift), used to excite plucked strings.
#[derive(Debug, Clone)]
pub struct Noise {
    state: u32,
}

impl Noise {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_sample(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x as f64 / u32::MAX as f64) * 2.0 - 1.0
    }
}
