//! # Timeline Builder
//!
//! Converts score events into instructions stamped with absolute times in
//! seconds. Both the live player and the offline renderer consume the same
//! timeline, so the two paths cannot disagree about when a note starts.
//!
//! ## Timing
//! - One abstract duration unit lasts [`BASE_TIME_UNIT_SECONDS`] (0.25 s).
//! - A sounding note is held for 95% of its slot ([`ARTICULATION`]) so two
//!   consecutive notes of the same pitch stay distinct.
//! - A chord member sounds for its own duration; the timeline advances by the
//!   chord's longest member.
//!
//! ## Instruction order
//! For every event the display instruction comes first, followed by the sound
//! instructions of that event, all at the same offset.
//!
//! ## Example
//! ```rust
//! use jianpu::{parse, timeline};
//!
//! let score = parse("1-1 2-1 0-2");
//! let timeline = timeline::build(&score.events, timeline::BASE_TIME_UNIT_SECONDS);
//!
//! assert!((timeline.total_duration - 1.0).abs() < 1e-9);
//! assert_eq!(timeline.sounds().count(), 2);
//! ```

use crate::ast::{Event, Pitch, PitchSpec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds per abstract duration unit
pub const BASE_TIME_UNIT_SECONDS: f64 = 0.25;

/// Fraction of a note's slot during which it actually sounds
pub const ARTICULATION: f64 = 0.95;

/// Conversion settings for [`build_with`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingSettings {
    pub base_unit: f64,
    pub articulation: f64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            base_unit: BASE_TIME_UNIT_SECONDS,
            articulation: ARTICULATION,
        }
    }
}

/// What to show while an event plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "pitches", rename_all = "lowercase")]
pub enum Cue {
    Note(PitchSpec),
    Chord(Vec<PitchSpec>),
    Rest,
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cue::Note(pitch) => pitch.fmt(f),
            Cue::Chord(pitches) => {
                for (i, pitch) in pitches.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" + ")?;
                    }
                    pitch.fmt(f)?;
                }
                Ok(())
            }
            Cue::Rest => f.write_str("rest"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InstructionKind {
    Display { cue: Cue },
    /// Start `pitch` and release it after `length` seconds
    Sound { pitch: PitchSpec, length: f64 },
}

/// A single timed instruction.
///
/// # Fields
/// - `at_time`: seconds from the start of the score
/// - `event_index`: index of the source event in `Score::events`
/// - `span`: duration of the source event in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub at_time: f64,
    pub event_index: usize,
    pub span: f64,
    pub kind: InstructionKind,
}

/// Timed instructions for a whole score.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub instructions: Vec<Instruction>,
    pub total_duration: f64,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Sound instructions only, as `(at_time, pitch, length)`.
    pub fn sounds(&self) -> impl Iterator<Item = (f64, PitchSpec, f64)> + '_ {
        self.instructions.iter().filter_map(|i| match i.kind {
            InstructionKind::Sound { pitch, length } => Some((i.at_time, pitch, length)),
            InstructionKind::Display { .. } => None,
        })
    }
}

/// Build a timeline with the default articulation.
pub fn build(events: &[Event], base_unit: f64) -> Timeline {
    build_with(
        events,
        &TimingSettings {
            base_unit,
            ..TimingSettings::default()
        },
    )
}

/// Build a timeline with explicit timing settings.
pub fn build_with(events: &[Event], settings: &TimingSettings) -> Timeline {
    let mut instructions = Vec::new();
    let mut offset = 0.0;

    for (event_index, event) in events.iter().enumerate() {
        let span = event.duration() * settings.base_unit;

        match event {
            Event::Note { pitch, duration } => {
                let cue = match pitch {
                    Pitch::Tone(spec) => Cue::Note(*spec),
                    Pitch::Rest => Cue::Rest,
                };
                instructions.push(Instruction {
                    at_time: offset,
                    event_index,
                    span,
                    kind: InstructionKind::Display { cue },
                });
                if let Pitch::Tone(spec) = pitch {
                    instructions.push(Instruction {
                        at_time: offset,
                        event_index,
                        span,
                        kind: InstructionKind::Sound {
                            pitch: *spec,
                            length: duration * settings.base_unit * settings.articulation,
                        },
                    });
                }
            }
            Event::Chord { notes, .. } => {
                instructions.push(Instruction {
                    at_time: offset,
                    event_index,
                    span,
                    kind: InstructionKind::Display {
                        cue: Cue::Chord(notes.iter().map(|n| n.pitch).collect()),
                    },
                });
                for note in notes {
                    instructions.push(Instruction {
                        at_time: offset,
                        event_index,
                        span,
                        kind: InstructionKind::Sound {
                            pitch: note.pitch,
                            length: note.duration * settings.base_unit * settings.articulation,
                        },
                    });
                }
            }
        }

        offset += span;
    }

    Timeline {
        instructions,
        total_duration: offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Letter;
    use crate::parser::parse;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_note_offsets_and_lengths() {
        let score = parse("1-1 2-2 3-1");
        let timeline = build(&score.events, BASE_TIME_UNIT_SECONDS);

        let sounds: Vec<_> = timeline.sounds().collect();
        assert_eq!(sounds.len(), 3);
        assert_eq!(sounds[0].0, 0.0);
        assert!((sounds[1].0 - 0.25).abs() < EPSILON);
        assert!((sounds[2].0 - 0.75).abs() < EPSILON);
        assert!((sounds[1].2 - 0.5 * 0.95).abs() < EPSILON);
        assert!((timeline.total_duration - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_rest_has_display_only() {
        let score = parse("0-2");
        let timeline = build(&score.events, BASE_TIME_UNIT_SECONDS);
        assert_eq!(timeline.instructions.len(), 1);
        assert_eq!(
            timeline.instructions[0].kind,
            InstructionKind::Display { cue: Cue::Rest }
        );
        assert!((timeline.total_duration - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_chord_members_use_own_lengths() {
        let score = parse("1-2\\3-4 5-1");
        let timeline = build(&score.events, BASE_TIME_UNIT_SECONDS);

        // display, two sounds, then display + sound for the next note
        assert_eq!(timeline.instructions.len(), 5);
        assert_eq!(
            timeline.instructions[0].kind,
            InstructionKind::Display {
                cue: Cue::Chord(vec![
                    PitchSpec::new(Letter::C, 4),
                    PitchSpec::new(Letter::E, 4)
                ])
            }
        );
        let sounds: Vec<_> = timeline.sounds().collect();
        assert_eq!(sounds[0].0, 0.0);
        assert_eq!(sounds[1].0, 0.0);
        assert!((sounds[0].2 - 2.0 * 0.25 * 0.95).abs() < EPSILON);
        assert!((sounds[1].2 - 4.0 * 0.25 * 0.95).abs() < EPSILON);
        // next event starts after the longest member
        assert!((sounds[2].0 - 1.0).abs() < EPSILON);
        assert!((timeline.total_duration - 1.25).abs() < EPSILON);
    }

    #[test]
    fn test_total_matches_units_times_base() {
        let score = parse("1-1 2-0.5 0-3 4-2\\5-1 ·1-0.25 9-0");
        for base in [0.25, 0.1, 0.5] {
            let timeline = build(&score.events, base);
            assert!((timeline.total_duration - score.total_units() * base).abs() < EPSILON);

            let last = timeline.instructions.last().unwrap();
            assert!((last.at_time + last.span - timeline.total_duration).abs() < EPSILON);
        }
    }

    #[test]
    fn test_custom_articulation() {
        let score = parse("1-4");
        let settings = TimingSettings {
            base_unit: 0.5,
            articulation: 1.0,
        };
        let timeline = build_with(&score.events, &settings);
        let sounds: Vec<_> = timeline.sounds().collect();
        assert_eq!(sounds[0].2, 2.0);
    }

    #[test]
    fn test_cue_display() {
        let chord = Cue::Chord(vec![PitchSpec::new(Letter::C, 4), PitchSpec::new(Letter::G, 4)]);
        assert_eq!(chord.to_string(), "C4 + G4");
        assert_eq!(Cue::Rest.to_string(), "rest");
    }

    #[test]
    fn test_serializes_camel_case() {
        let score = parse("1-1");
        let timeline = build(&score.events, BASE_TIME_UNIT_SECONDS);
        let json = serde_json::to_string(&timeline).unwrap();
        assert!(json.contains("\"totalDuration\""));
        assert!(json.contains("\"atTime\""));
        assert!(json.contains("\"eventIndex\""));
    }
}
