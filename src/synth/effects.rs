//! Post-processing applied to a producer's output: a three-band equalizer
//! and a comb/allpass reverb.

use crate::instrument::{Effects, Eq3, Reverb as ReverbConfig};
use std::f64::consts::TAU;

/// Crossover between the low and mid bands
const LOW_CROSSOVER_HZ: f64 = 400.0;
/// Crossover between the mid and high bands
const HIGH_CROSSOVER_HZ: f64 = 2500.0;

/// Comb delays at 44.1 kHz
const COMB_DELAYS: [usize; 4] = [1116, 1188, 1277, 1356];
const ALLPASS_DELAYS: [usize; 2] = [556, 441];
const ALLPASS_FEEDBACK: f64 = 0.5;

pub trait Effect {
    fn process(&mut self, input: f64) -> f64;

    fn reset(&mut self);
}

/// Convert a gain in dB to a linear factor.
pub fn db_to_gain(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// y[n] = a * x[n] + (1 - a) * y[n-1]
#[derive(Debug, Clone)]
struct OnePole {
    alpha: f64,
    prev: f64,
}

impl OnePole {
    fn new(cutoff_hz: f64, sample_rate: f64) -> Self {
        let rc = (TAU * cutoff_hz).recip();
        let dt = sample_rate.recip();
        Self {
            alpha: dt / (rc + dt),
            prev: 0.0,
        }
    }

    fn process(&mut self, input: f64) -> f64 {
        self.prev = self.alpha * input + (1.0 - self.alpha) * self.prev;
        self.prev
    }
}

/// Three-band equalizer built from two one-pole crossovers. The bands sum
/// back to the input, so 0 dB everywhere is transparent.
#[derive(Debug, Clone)]
pub struct ThreeBandEq {
    low_split: OnePole,
    high_split: OnePole,
    low_gain: f64,
    mid_gain: f64,
    high_gain: f64,
}

impl ThreeBandEq {
    pub fn new(eq: &Eq3, sample_rate: f64) -> Self {
        Self {
            low_split: OnePole::new(LOW_CROSSOVER_HZ, sample_rate),
            high_split: OnePole::new(HIGH_CROSSOVER_HZ, sample_rate),
            low_gain: db_to_gain(eq.low),
            mid_gain: db_to_gain(eq.mid),
            high_gain: db_to_gain(eq.high),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.low_gain == 1.0 && self.mid_gain == 1.0 && self.high_gain == 1.0
    }
}

impl Effect for ThreeBandEq {
    fn process(&mut self, input: f64) -> f64 {
        let low = self.low_split.process(input);
        let high = input - self.high_split.process(input);
        let mid = input - low - high;
        low * self.low_gain + mid * self.mid_gain + high * self.high_gain
    }

    fn reset(&mut self) {
        self.low_split.prev = 0.0;
        self.high_split.prev = 0.0;
    }
}

#[derive(Debug, Clone)]
struct DelayLine {
    buffer: Vec<f64>,
    pos: usize,
}

impl DelayLine {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            pos: 0,
        }
    }

    fn read(&self) -> f64 {
        self.buffer[self.pos]
    }

    fn write_and_advance(&mut self, value: f64) {
        self.buffer[self.pos] = value;
        self.pos = (self.pos + 1) % self.buffer.len();
    }

    fn clear(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.pos = 0;
    }
}

/// Schroeder reverb: four parallel feedback combs into two series allpasses.
///
/// Comb feedback is derived from the decay time so that each comb loses
/// 60 dB over `decay` seconds.
#[derive(Debug, Clone)]
pub struct Reverb {
    combs: Vec<(DelayLine, f64)>,
    allpasses: Vec<DelayLine>,
    wet: f64,
}

impl Reverb {
    pub fn new(config: &ReverbConfig, sample_rate: f64) -> Self {
        let scale = sample_rate / 44100.0;
        let decay = config.decay.max(1e-3);
        let combs = COMB_DELAYS
            .iter()
            .map(|&d| {
                let length = ((d as f64 * scale) as usize).max(1);
                let feedback = 10f64.powf(-3.0 * length as f64 / (decay * sample_rate));
                (DelayLine::new(length), feedback.min(0.98))
            })
            .collect();
        let allpasses = ALLPASS_DELAYS
            .iter()
            .map(|&d| DelayLine::new((d as f64 * scale) as usize))
            .collect();
        Self {
            combs,
            allpasses,
            wet: config.wet.clamp(0.0, 1.0),
        }
    }

    pub fn wet(&self) -> f64 {
        self.wet
    }
}

impl Effect for Reverb {
    fn process(&mut self, input: f64) -> f64 {
        let mut comb_out = 0.0;
        for (line, feedback) in self.combs.iter_mut() {
            let delayed = line.read();
            line.write_and_advance(input + delayed * *feedback);
            comb_out += delayed;
        }
        let mut out = comb_out / self.combs.len() as f64;

        for line in self.allpasses.iter_mut() {
            let delayed = line.read();
            line.write_and_advance(out + delayed * ALLPASS_FEEDBACK);
            out = delayed - out * ALLPASS_FEEDBACK;
        }

        input * (1.0 - self.wet) + out * self.wet
    }

    fn reset(&mut self) {
        self.combs.iter_mut().for_each(|(line, _)| line.clear());
        self.allpasses.iter_mut().for_each(DelayLine::clear);
    }
}

/// Run the configured effect chain over a mono signal in place.
pub fn apply_chain(effects: &Effects, samples: &mut [f64], sample_rate: f64) {
    let mut eq = ThreeBandEq::new(&effects.eq, sample_rate);
    if !eq.is_flat() {
        samples.iter_mut().for_each(|s| *s = eq.process(*s));
    }
    let mut reverb = Reverb::new(&effects.reverb, sample_rate);
    if reverb.wet() > 0.0 {
        samples.iter_mut().for_each(|s| *s = reverb.process(*s));
    }
}
