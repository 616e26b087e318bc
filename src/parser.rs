//! # Score Parser
//!
//! Turns score text into a [`Score`]. Parsing never fails as a whole: a token
//! that cannot be understood is dropped, reported as a [`Diagnostic`] and
//! logged, and the rest of the line keeps parsing.
//!
//! ## Format
//! ```text
//! BPM:100              optional header, first non-blank line only
//! 1-1 2-1 0-2          <degree>-<duration> tokens separated by whitespace
//! ·1-2 ~5-1            · raises one octave, ~ lowers one octave
//! 1-2\3-2\5-4          chord: sub-tokens joined by backslashes
//! ```
//!
//! - degree `0` is a rest (ignored inside chords)
//! - degrees `1`..`9` map to `C D E F G A B C D`
//! - duration is a decimal number of base time units, `0` allowed
//!
//! ## Example
//! ```rust
//! use jianpu::{parse, Event, Letter, Pitch, PitchSpec};
//!
//! let score = parse("BPM:100\n1-1 2-1 0-2\n");
//! assert_eq!(score.tempo_bpm, 100);
//! assert_eq!(score.events.len(), 3);
//! assert_eq!(
//!     score.events[0],
//!     Event::Note { pitch: Pitch::Tone(PitchSpec::new(Letter::C, 4)), duration: 1.0 }
//! );
//! ```

use crate::ast::*;
use crate::error::PlayerError;
use crate::lexer::{Lexer, LocatedToken};
use std::fmt;

const HEADER_PREFIX: &str = "BPM:";
const CHORD_SEPARATOR: char = '\\';
const OCTAVE_UP: char = '·';
const OCTAVE_DOWN: char = '~';

/// A token the parser dropped, with where it was and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub token: String,
    pub message: String,
}

impl Diagnostic {
    pub fn to_error(&self) -> PlayerError {
        PlayerError::Parse {
            line: self.line,
            column: self.column,
            message: self.message.clone(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_error())
    }
}

/// Parse score text, discarding diagnostics.
pub fn parse(source: &str) -> Score {
    parse_with_diagnostics(source).0
}

/// Parse score text and return the diagnostics for every dropped token.
pub fn parse_with_diagnostics(source: &str) -> (Score, Vec<Diagnostic>) {
    let mut parser = Parser::new();
    let score = parser.parse_score(source);
    (score, parser.diagnostics)
}

/// Parser state: collects diagnostics while walking the lines
struct Parser {
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    fn report(&mut self, token: &str, line: usize, column: usize, message: String) {
        log::warn!("line {}, column {}: {} (token '{}')", line, column, message, token);
        self.diagnostics.push(Diagnostic {
            line,
            column,
            token: token.to_string(),
            message,
        });
    }

    fn parse_score(&mut self, source: &str) -> Score {
        let lines = Lexer::new(source).lines();
        let mut tempo_bpm = DEFAULT_TEMPO_BPM;
        let mut body = &lines[..];

        if let Some(first) = lines.first() {
            let header = first.text.trim();
            if let Some(value) = header.strip_prefix(HEADER_PREFIX) {
                tempo_bpm = self.parse_tempo(value, first.number, header);
                body = &lines[1..];
            }
        }

        let mut events = Vec::new();
        for line in body {
            for token in Lexer::tokenize(line) {
                if let Some(event) = self.parse_token(&token) {
                    events.push(event);
                }
            }
        }

        log::debug!("parsed {} events at {} BPM", events.len(), tempo_bpm);
        Score { tempo_bpm, events }
    }

    fn parse_tempo(&mut self, value: &str, line: usize, header: &str) -> u32 {
        match leading_integer(value) {
            Some(bpm) if bpm > 0 => bpm,
            _ => {
                self.report(
                    header,
                    line,
                    1,
                    format!(
                        "invalid tempo '{}', using {} BPM",
                        value.trim(),
                        DEFAULT_TEMPO_BPM
                    ),
                );
                DEFAULT_TEMPO_BPM
            }
        }
    }

    fn parse_token(&mut self, token: &LocatedToken) -> Option<Event> {
        if !token.text.contains(CHORD_SEPARATOR) {
            let (pitch, duration) = self.parse_note(token.text, token.line, token.column)?;
            return Some(Event::Note { pitch, duration });
        }

        let mut notes = Vec::new();
        let mut column = token.column;
        for part in token.text.split(CHORD_SEPARATOR) {
            match self.parse_note(part, token.line, column) {
                Some((Pitch::Tone(pitch), duration)) => notes.push(ChordNote { pitch, duration }),
                Some((Pitch::Rest, _)) => {
                    log::debug!(
                        "line {}, column {}: rest inside chord '{}' ignored",
                        token.line,
                        column,
                        token.text
                    );
                }
                None => {}
            }
            column += part.chars().count() + 1;
        }

        let chord = Event::chord(notes);
        if chord.is_none() {
            log::debug!("line {}: chord '{}' has no playable notes", token.line, token.text);
        }
        chord
    }

    /// Parse `<pitch>-<duration>`. Returns `None` (after reporting) when
    /// either half is unusable.
    fn parse_note(&mut self, text: &str, line: usize, column: usize) -> Option<(Pitch, f64)> {
        let Some((pitch_text, duration_text)) = text.split_once('-') else {
            self.report(text, line, column, "expected <pitch>-<duration>".to_string());
            return None;
        };

        let pitch = match self.parse_pitch(pitch_text) {
            Ok(pitch) => pitch,
            Err(message) => {
                self.report(text, line, column, message);
                return None;
            }
        };

        match duration_text.parse::<f64>() {
            Ok(duration) if duration.is_finite() && duration >= 0.0 => Some((pitch, duration)),
            _ => {
                self.report(
                    text,
                    line,
                    column,
                    format!("invalid duration '{}'", duration_text),
                );
                None
            }
        }
    }

    fn parse_pitch(&self, text: &str) -> Result<Pitch, String> {
        if text == "0" {
            return Ok(Pitch::Rest);
        }

        let (shift, digits) = if let Some(rest) = text.strip_prefix(OCTAVE_UP) {
            (1, rest)
        } else if let Some(rest) = text.strip_prefix(OCTAVE_DOWN) {
            (-1, rest)
        } else {
            (0, text)
        };

        digits
            .parse::<u32>()
            .ok()
            .and_then(Letter::from_degree)
            .map(|letter| Pitch::Tone(PitchSpec::new(letter, DEFAULT_OCTAVE + shift)))
            .ok_or_else(|| format!("unknown degree '{}'", text))
    }
}

/// Digits at the start of `value` after optional whitespace and `+`, so
/// `90 1-1` and `90.5` both read as 90.
fn leading_integer(value: &str) -> Option<u32> {
    let value = value.trim_start();
    let value = value.strip_prefix('+').unwrap_or(value);
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}
