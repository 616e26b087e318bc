//! Single-note voices.
//!
//! A voice renders one note from note-on through the end of its release.
//! The note is held for `length` seconds, then released.

use super::envelope::{EnvelopeParams, EnvelopeState};
use super::oscillator::{Noise, Oscillator};
use crate::instrument::{InstrumentConfig, SynthKind};
use std::f64::consts::TAU;

/// Modulator ratio multiplier that keeps metal partials off the harmonic
/// series
const METAL_INHARMONICITY: f64 = 1.483;
/// Loop gain of the plucked string
const PLUCK_DAMPING: f64 = 0.996;
/// Output scaling so a full chord stays below clipping
const VOICE_LEVEL: f64 = 0.3;

/// Render one note as mono samples at full envelope scale.
pub fn render_note(config: &InstrumentConfig, frequency: f64, length: f64, sample_rate: f64) -> Vec<f64> {
    let hold = (length.max(0.0) * sample_rate).round() as usize;
    match config.synth_type {
        SynthKind::PluckSynth => pluck(config, frequency, hold, sample_rate),
        kind => oscillator_voice(kind, config, frequency, hold, sample_rate),
    }
}

fn oscillator_voice(
    kind: SynthKind,
    config: &InstrumentConfig,
    frequency: f64,
    hold: usize,
    sample_rate: f64,
) -> Vec<f64> {
    let amp_params = EnvelopeParams::from_seconds(&config.envelope, sample_rate);
    let mod_params = EnvelopeParams::from_seconds(&config.modulation_envelope, sample_rate);
    let mut amp_env = EnvelopeState::new(amp_params);
    let mut mod_env = EnvelopeState::new(mod_params);
    amp_env.note_on();
    mod_env.note_on();

    let mut carrier = Oscillator::new(config.oscillator);
    let mut modulator = Oscillator::new(config.modulation);
    let mod_freq = match kind {
        SynthKind::MetalSynth => frequency * config.harmonicity * METAL_INHARMONICITY,
        _ => frequency * config.harmonicity,
    };
    // modulation index is in radians, the oscillator takes cycles
    let depth = config.modulation_index / TAU;

    let mut out = Vec::with_capacity(hold + amp_params.release + 1);
    let mut n = 0;
    loop {
        if n == hold {
            amp_env.note_off();
            mod_env.note_off();
        }
        if n > hold && !amp_env.is_active() {
            break;
        }
        let amp = amp_env.next_level();
        let m = mod_env.next_level();
        let sample = match kind {
            SynthKind::AmSynth => {
                let tremolo = 1.0 - 0.5 * m * (1.0 - modulator.next_sample(mod_freq, sample_rate));
                carrier.next_sample(frequency, sample_rate) * tremolo
            }
            SynthKind::FmSynth | SynthKind::MetalSynth => {
                let phase_mod = depth * m * modulator.next_sample(mod_freq, sample_rate);
                carrier.next_sample_pm(frequency, sample_rate, phase_mod)
            }
            SynthKind::Synth | SynthKind::PluckSynth => carrier.next_sample(frequency, sample_rate),
        };
        out.push(sample * amp * VOICE_LEVEL);
        n += 1;
    }
    out
}

/// Karplus-Strong string: a noise burst circulating through an averaging
/// delay line. After `hold` samples the amplitude release envelope fades it.
fn pluck(config: &InstrumentConfig, frequency: f64, hold: usize, sample_rate: f64) -> Vec<f64> {
    let period = ((sample_rate / frequency.max(1.0)).round() as usize).max(2);
    let mut noise = Noise::new(period as u32 ^ 0x9E37_79B9);
    let mut line: Vec<f64> = (0..period).map(|_| noise.next_sample()).collect();

    let release = EnvelopeParams::from_seconds(&config.envelope, sample_rate).release;
    let total = hold + release;
    let mut out = Vec::with_capacity(total);
    let mut pos = 0;
    for n in 0..total {
        let next = (pos + 1) % period;
        let sample = line[pos];
        line[pos] = PLUCK_DAMPING * 0.5 * (line[pos] + line[next]);
        pos = next;

        let fade = if n < hold {
            1.0
        } else {
            1.0 - (n - hold) as f64 / release as f64
        };
        out.push(sample * fade * VOICE_LEVEL);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Envelope;

    const RATE: f64 = 1000.0;

    fn config(kind: SynthKind) -> InstrumentConfig {
        InstrumentConfig {
            synth_type: kind,
            envelope: Envelope::new(0.01, 0.1, 0.5, 0.2),
            ..InstrumentConfig::default()
        }
    }

    fn peak(samples: &[f64]) -> f64 {
        samples.iter().fold(0.0, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_note_length_includes_release() {
        let samples = render_note(&config(SynthKind::Synth), 100.0, 0.5, RATE);
        // 500 held samples, 200 release samples, one final zero sample
        assert_eq!(samples.len(), 701);
        assert_eq!(*samples.last().unwrap(), 0.0);
    }

    #[test]
    fn test_every_kind_produces_bounded_sound() {
        for kind in [
            SynthKind::Synth,
            SynthKind::AmSynth,
            SynthKind::FmSynth,
            SynthKind::PluckSynth,
            SynthKind::MetalSynth,
        ] {
            let samples = render_note(&config(kind), 220.0, 0.3, 8000.0);
            let p = peak(&samples);
            assert!(p > 0.0, "{:?} is silent", kind);
            assert!(p <= VOICE_LEVEL + 1e-9, "{:?} peaks at {}", kind, p);
        }
    }

    #[test]
    fn test_zero_length_note_only_releases() {
        let samples = render_note(&config(SynthKind::Synth), 100.0, 0.0, RATE);
        assert_eq!(samples.len(), 201);
        assert!(peak(&samples) == 0.0);
    }

    #[test]
    fn test_pluck_length() {
        let samples = render_note(&config(SynthKind::PluckSynth), 110.0, 0.5, RATE);
        assert_eq!(samples.len(), 700);
    }
}
