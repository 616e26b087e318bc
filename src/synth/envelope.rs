//! ADSR envelope state machine.

use crate::instrument::Envelope;

/// Envelope times converted to samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub attack: usize,
    pub decay: usize,
    pub sustain: f64,
    pub release: usize,
}

impl EnvelopeParams {
    pub fn from_seconds(envelope: &Envelope, sample_rate: f64) -> Self {
        let samples = |seconds: f64| (seconds.max(0.0) * sample_rate).round() as usize;
        Self {
            attack: samples(envelope.attack),
            decay: samples(envelope.decay),
            sustain: envelope.sustain.clamp(0.0, 1.0),
            release: samples(envelope.release),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopePhase {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Per-voice envelope state. Every transition is continuous in level.
#[derive(Debug, Clone)]
pub struct EnvelopeState {
    params: EnvelopeParams,
    phase: EnvelopePhase,
    counter: usize,
    level: f64,
    release_from: f64,
}

impl EnvelopeState {
    pub fn new(params: EnvelopeParams) -> Self {
        Self {
            params,
            phase: EnvelopePhase::Idle,
            counter: 0,
            level: 0.0,
            release_from: 0.0,
        }
    }

    pub fn note_on(&mut self) {
        self.phase = EnvelopePhase::Attack;
        self.counter = 0;
    }

    pub fn note_off(&mut self) {
        if self.phase != EnvelopePhase::Idle {
            self.phase = EnvelopePhase::Release;
            self.counter = 0;
            self.release_from = self.level;
        }
    }

    pub fn phase(&self) -> EnvelopePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != EnvelopePhase::Idle
    }

    /// Advance by one sample and return the level.
    pub fn next_level(&mut self) -> f64 {
        let p = self.params;
        match self.phase {
            EnvelopePhase::Idle => self.level = 0.0,
            EnvelopePhase::Attack => {
                if self.counter >= p.attack {
                    self.level = 1.0;
                    self.enter(EnvelopePhase::Decay);
                } else {
                    self.level = self.counter as f64 / p.attack as f64;
                    self.counter += 1;
                }
            }
            EnvelopePhase::Decay => {
                if self.counter >= p.decay {
                    self.level = p.sustain;
                    self.enter(EnvelopePhase::Sustain);
                } else {
                    let t = self.counter as f64 / p.decay as f64;
                    self.level = 1.0 + (p.sustain - 1.0) * t;
                    self.counter += 1;
                }
            }
            EnvelopePhase::Sustain => self.level = p.sustain,
            EnvelopePhase::Release => {
                if self.counter >= p.release {
                    self.level = 0.0;
                    self.enter(EnvelopePhase::Idle);
                } else {
                    let t = self.counter as f64 / p.release as f64;
                    self.level = self.release_from * (1.0 - t);
                    self.counter += 1;
                }
            }
        }
        self.level
    }

    fn enter(&mut self, phase: EnvelopePhase) {
        self.phase = phase;
        self.counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> EnvelopeParams {
        EnvelopeParams {
            attack: 10,
            decay: 10,
            sustain: 0.5,
            release: 10,
        }
    }

    #[test]
    fn test_from_seconds() {
        let p = EnvelopeParams::from_seconds(&Envelope::new(0.01, 0.5, 1.5, 1.0), 1000.0);
        assert_eq!(p.attack, 10);
        assert_eq!(p.decay, 500);
        assert_eq!(p.sustain, 1.0);
        assert_eq!(p.release, 1000);
    }

    #[test]
    fn test_attack_decay_sustain() {
        let mut env = EnvelopeState::new(params());
        env.note_on();
        let attack: Vec<f64> = (0..10).map(|_| env.next_level()).collect();
        assert_eq!(attack[0], 0.0);
        assert!(attack.windows(2).all(|w| w[1] > w[0]));

        assert_eq!(env.next_level(), 1.0);
        assert_eq!(env.phase(), EnvelopePhase::Decay);
        for _ in 0..20 {
            env.next_level();
        }
        assert_eq!(env.phase(), EnvelopePhase::Sustain);
        assert_eq!(env.next_level(), 0.5);
    }

    #[test]
    fn test_release_reaches_idle() {
        let mut env = EnvelopeState::new(params());
        env.note_on();
        for _ in 0..40 {
            env.next_level();
        }
        env.note_off();
        assert_eq!(env.next_level(), 0.5);
        for _ in 0..10 {
            env.next_level();
        }
        assert!(!env.is_active());
        assert_eq!(env.next_level(), 0.0);
    }

    #[test]
    fn test_release_during_attack_is_continuous() {
        let mut env = EnvelopeState::new(params());
        env.note_on();
        for _ in 0..6 {
            env.next_level();
        }
        let before = env.next_level();
        env.note_off();
        let after = env.next_level();
        assert_eq!(before, after);
    }

    #[test]
    fn test_zero_length_phases() {
        let mut env = EnvelopeState::new(EnvelopeParams {
            attack: 0,
            decay: 0,
            sustain: 0.3,
            release: 0,
        });
        env.note_on();
        assert_eq!(env.next_level(), 1.0);
        assert_eq!(env.next_level(), 0.3);
        env.note_off();
        assert_eq!(env.next_level(), 0.0);
        assert!(!env.is_active());
    }
}
