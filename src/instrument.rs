//! Instrument configuration.
//!
//! An [`InstrumentConfig`] is a plain value handed to the sound engine when a
//! producer is created. The player never reads its fields; it only passes the
//! value through. Changing instruments means building a new value.
//!
//! The built-in instruments are available through
//! [`InstrumentConfig::builtin`].

use serde::{Deserialize, Serialize};

/// Synthesis technique used by a producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SynthKind {
    #[default]
    Synth,
    #[serde(rename = "AMSynth")]
    AmSynth,
    #[serde(rename = "FMSynth")]
    FmSynth,
    PluckSynth,
    MetalSynth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

/// Attack/decay/release in seconds, sustain as a level in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Envelope {
    pub const fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }
}

/// Three-band equalizer gains in dB
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Eq3 {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

/// Reverb tail length in seconds and dry/wet mix in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reverb {
    pub decay: f64,
    pub wet: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Effects {
    pub eq: Eq3,
    pub reverb: Reverb,
}

impl Default for Reverb {
    fn default() -> Self {
        Self {
            decay: 1.2,
            wet: 0.15,
        }
    }
}

/// Full description of an instrument voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentConfig {
    pub synth_type: SynthKind,
    pub oscillator: Waveform,
    pub envelope: Envelope,
    /// Modulator waveform (AM/FM voices)
    pub modulation: Waveform,
    pub modulation_envelope: Envelope,
    pub harmonicity: f64,
    pub modulation_index: f64,
    pub effects: Effects,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            synth_type: SynthKind::Synth,
            oscillator: Waveform::Sine,
            envelope: Envelope::new(0.01, 0.5, 0.3, 1.0),
            modulation: Waveform::Sine,
            modulation_envelope: Envelope::new(0.5, 0.5, 0.3, 0.5),
            harmonicity: 1.0,
            modulation_index: 5.0,
            effects: Effects::default(),
        }
    }
}

/// Names accepted by [`InstrumentConfig::builtin`].
pub const BUILTIN_INSTRUMENTS: [&str; 7] = [
    "piano",
    "guitar",
    "guzheng",
    "flute",
    "violin",
    "xylophone",
    "synth",
];

impl InstrumentConfig {
    /// Look up a built-in instrument by name (case-insensitive).
    ///
    /// # Example
    /// ```
    /// use jianpu::{InstrumentConfig, SynthKind};
    ///
    /// let piano = InstrumentConfig::builtin("Piano").unwrap();
    /// assert_eq!(piano.synth_type, SynthKind::AmSynth);
    /// assert!(InstrumentConfig::builtin("theremin").is_none());
    /// ```
    pub fn builtin(name: &str) -> Option<Self> {
        let config = match name.to_ascii_lowercase().as_str() {
            "piano" => Self {
                synth_type: SynthKind::AmSynth,
                oscillator: Waveform::Sine,
                envelope: Envelope::new(0.01, 2.0, 0.4, 2.0),
                modulation: Waveform::Square,
                modulation_envelope: Envelope::new(0.5, 0.5, 0.3, 0.5),
                harmonicity: 2.5,
                modulation_index: 0.0,
                effects: Effects {
                    eq: Eq3 { low: 2.0, mid: 2.0, high: 0.0 },
                    reverb: Reverb { decay: 1.2, wet: 0.15 },
                },
            },
            "guitar" => Self {
                synth_type: SynthKind::FmSynth,
                oscillator: Waveform::Triangle,
                envelope: Envelope::new(0.01, 0.2, 0.3, 1.2),
                modulation: Waveform::Square,
                modulation_envelope: Envelope::new(0.5, 0.1, 0.2, 0.5),
                harmonicity: 1.1,
                modulation_index: 5.0,
                effects: Effects {
                    eq: Eq3 { low: 3.0, mid: 0.0, high: 1.0 },
                    reverb: Reverb { decay: 1.5, wet: 0.2 },
                },
            },
            "guzheng" => Self {
                synth_type: SynthKind::FmSynth,
                oscillator: Waveform::Triangle,
                envelope: Envelope::new(0.001, 1.5, 0.1, 2.0),
                modulation: Waveform::Sine,
                modulation_envelope: Envelope::new(0.001, 0.5, 0.1, 0.5),
                harmonicity: 3.5,
                modulation_index: 10.0,
                effects: Effects {
                    eq: Eq3 { low: -2.0, mid: 0.0, high: 6.0 },
                    reverb: Reverb { decay: 2.0, wet: 0.25 },
                },
            },
            "flute" => Self {
                synth_type: SynthKind::FmSynth,
                oscillator: Waveform::Sine,
                envelope: Envelope::new(0.1, 0.2, 0.8, 0.8),
                modulation: Waveform::Sine,
                modulation_envelope: Envelope::new(0.5, 0.1, 0.7, 0.3),
                harmonicity: 1.5,
                modulation_index: 3.0,
                effects: Effects {
                    eq: Eq3 { low: -3.0, mid: 2.0, high: 4.0 },
                    reverb: Reverb { decay: 1.8, wet: 0.3 },
                },
            },
            "violin" => Self {
                synth_type: SynthKind::AmSynth,
                oscillator: Waveform::Sawtooth,
                envelope: Envelope::new(0.1, 0.3, 0.7, 1.0),
                modulation: Waveform::Sine,
                modulation_envelope: Envelope::new(0.5, 0.5, 0.5, 0.5),
                harmonicity: 1.5,
                modulation_index: 0.0,
                effects: Effects {
                    eq: Eq3 { low: 0.0, mid: 3.0, high: 2.0 },
                    reverb: Reverb { decay: 1.5, wet: 0.2 },
                },
            },
            "xylophone" => Self {
                synth_type: SynthKind::Synth,
                oscillator: Waveform::Triangle,
                envelope: Envelope::new(0.001, 0.5, 0.0, 0.1),
                modulation: Waveform::Square,
                modulation_envelope: Envelope::new(0.5, 0.5, 0.3, 0.5),
                harmonicity: 3.1,
                modulation_index: 16.0,
                effects: Effects {
                    eq: Eq3 { low: -6.0, mid: 0.0, high: 6.0 },
                    reverb: Reverb { decay: 0.8, wet: 0.1 },
                },
            },
            "synth" | "default" => Self::default(),
            _ => return None,
        };
        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_builtin_resolves() {
        for name in BUILTIN_INSTRUMENTS {
            assert!(InstrumentConfig::builtin(name).is_some(), "{} missing", name);
        }
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(InstrumentConfig::builtin("guitar").unwrap()).unwrap();
        assert_eq!(json["synthType"], "FMSynth");
        assert_eq!(json["oscillator"], "triangle");
        assert_eq!(json["modulationIndex"], 5.0);
        assert_eq!(json["effects"]["reverb"]["wet"], 0.2);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: InstrumentConfig =
            serde_json::from_str(r#"{"synthType":"PluckSynth","harmonicity":2.0}"#).unwrap();
        assert_eq!(config.synth_type, SynthKind::PluckSynth);
        assert_eq!(config.harmonicity, 2.0);
        assert_eq!(config.envelope, InstrumentConfig::default().envelope);
    }
}
