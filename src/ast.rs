//! # Score Types
//!
//! This module defines the structures produced by the parser.
//!
//! ## Type Hierarchy
//! ```text
//! Score
//!   ├── tempo_bpm: u32 (default 120)
//!   └── Vec<Event>
//!         ├── Note { pitch: Pitch, duration }
//!         │     └── Pitch = Tone(PitchSpec) | Rest
//!         └── Chord { notes: Vec<ChordNote>, duration = max member }
//!               └── ChordNote { pitch: PitchSpec, duration }
//! ```
//!
//! ## Key Concepts
//!
//! ### Degrees
//! Digits `1`..`9` name scale positions. The lookup is fixed and does not
//! depend on any key: `1 2 3 4 5 6 7` are `C D E F G A B`, `8` and `9` are
//! `C` and `D` again.
//!
//! ### Octaves
//! Every note starts in octave 4 (middle C is `C4`). A leading `·` raises the
//! note by one octave and a leading `~` lowers it by one.
//!
//! ### Durations
//! Durations are counted in abstract units. The timeline turns one unit into
//! a fixed number of seconds, so the tempo header is informational.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Octave used when a note carries no octave marker.
pub const DEFAULT_OCTAVE: i8 = 4;

/// Tempo used when the score has no `BPM:` header.
pub const DEFAULT_TEMPO_BPM: u32 = 120;

/// Letter names of the diatonic scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    /// Semitones above C within one octave.
    pub fn semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    /// Resolve a scale degree (`1`..=`9`) to its letter.
    ///
    /// # Example
    /// ```
    /// use jianpu::Letter;
    ///
    /// assert_eq!(Letter::from_degree(1), Some(Letter::C));
    /// assert_eq!(Letter::from_degree(7), Some(Letter::B));
    /// assert_eq!(Letter::from_degree(9), Some(Letter::D));
    /// assert_eq!(Letter::from_degree(0), None);
    /// ```
    pub fn from_degree(degree: u32) -> Option<Self> {
        match degree {
            1 | 8 => Some(Letter::C),
            2 | 9 => Some(Letter::D),
            3 => Some(Letter::E),
            4 => Some(Letter::F),
            5 => Some(Letter::G),
            6 => Some(Letter::A),
            7 => Some(Letter::B),
            _ => None,
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Letter::C => "C",
            Letter::D => "D",
            Letter::E => "E",
            Letter::F => "F",
            Letter::G => "G",
            Letter::A => "A",
            Letter::B => "B",
        };
        f.write_str(name)
    }
}

/// A concrete pitch: letter plus octave.
///
/// Displays in scientific pitch notation, e.g. `C4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PitchSpec {
    pub letter: Letter,
    pub octave: i8,
}

impl PitchSpec {
    pub fn new(letter: Letter, octave: i8) -> Self {
        Self { letter, octave }
    }

    /// MIDI note number (C4 = 60). May fall outside 0..=127 for extreme octaves.
    pub fn midi_note(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.letter.semitone()
    }

    /// Equal-tempered frequency in Hz with A4 = 440 Hz.
    ///
    /// # Example
    /// ```
    /// use jianpu::{Letter, PitchSpec};
    ///
    /// let a4 = PitchSpec::new(Letter::A, 4);
    /// assert!((a4.frequency() - 440.0).abs() < 1e-9);
    /// ```
    pub fn frequency(&self) -> f64 {
        440.0 * 2f64.powf((self.midi_note() - 69) as f64 / 12.0)
    }
}

impl fmt::Display for PitchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.octave)
    }
}

/// Pitch of a single note: either a sounding tone or a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pitch {
    Tone(PitchSpec),
    Rest,
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pitch::Tone(spec) => spec.fmt(f),
            Pitch::Rest => f.write_str("rest"),
        }
    }
}

/// One member of a chord. Members keep their own durations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChordNote {
    pub pitch: PitchSpec,
    pub duration: f64,
}

/// A timed event in the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Note { pitch: Pitch, duration: f64 },
    /// `duration` is the longest member duration; the timeline advances by it.
    Chord { notes: Vec<ChordNote>, duration: f64 },
}

impl Event {
    /// Duration in abstract units
    pub fn duration(&self) -> f64 {
        match self {
            Event::Note { duration, .. } | Event::Chord { duration, .. } => *duration,
        }
    }

    /// Build a chord from its members, deriving the nominal duration.
    /// Returns `None` when there are no members.
    pub fn chord(notes: Vec<ChordNote>) -> Option<Self> {
        if notes.is_empty() {
            return None;
        }
        let duration = notes.iter().map(|n| n.duration).fold(0.0, f64::max);
        Some(Event::Chord { notes, duration })
    }
}

/// A parsed score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub tempo_bpm: u32,
    pub events: Vec<Event>,
}

impl Default for Score {
    fn default() -> Self {
        Self {
            tempo_bpm: DEFAULT_TEMPO_BPM,
            events: Vec::new(),
        }
    }
}

impl Score {
    /// Sum of all event durations in abstract units.
    pub fn total_units(&self) -> f64 {
        self.events.iter().map(Event::duration).sum()
    }
}

/// Key names by selector number, used for display only.
///
/// # Example
/// ```
/// use jianpu::key_name;
///
/// assert_eq!(key_name(1), Some("C"));
/// assert_eq!(key_name(7), Some("F#"));
/// assert_eq!(key_name(13), None);
/// ```
pub fn key_name(index: u8) -> Option<&'static str> {
    const KEYS: [&str; 12] = [
        "C", "G", "D", "A", "E", "B", "F#", "Db", "Ab", "Eb", "Bb", "F",
    ];
    index
        .checked_sub(1)
        .and_then(|i| KEYS.get(i as usize))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi_numbers() {
        assert_eq!(PitchSpec::new(Letter::C, 4).midi_note(), 60);
        assert_eq!(PitchSpec::new(Letter::B, 3).midi_note(), 59);
        assert_eq!(PitchSpec::new(Letter::D, 5).midi_note(), 74);
    }

    #[test]
    fn test_chord_duration_is_longest_member() {
        let c4 = PitchSpec::new(Letter::C, 4);
        let e4 = PitchSpec::new(Letter::E, 4);
        let chord = Event::chord(vec![
            ChordNote { pitch: c4, duration: 2.0 },
            ChordNote { pitch: e4, duration: 4.0 },
        ])
        .unwrap();
        assert_eq!(chord.duration(), 4.0);
        assert!(Event::chord(vec![]).is_none());
    }

    #[test]
    fn test_pitch_display() {
        assert_eq!(Pitch::Tone(PitchSpec::new(Letter::F, 3)).to_string(), "F3");
        assert_eq!(Pitch::Rest.to_string(), "rest");
    }
}
