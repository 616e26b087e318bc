//! # Synth Engine
//!
//! A self-contained [`SoundEngine`] that needs no audio device.
//!
//! ## Sub-modules
//! - `oscillator` - Phase-accumulator waveforms and noise
//! - `envelope` - ADSR state machine
//! - `voice` - One note per voice kind (Synth, AM, FM, pluck, metal)
//! - `effects` - Three-band EQ and reverb
//!
//! ## Contexts
//! In its real-time context the engine accepts and validates triggers but
//! produces no samples; hosts that want audible output plug in their own
//! engine. After [`SoundEngine::enter_offline`] every producer records its
//! notes into the offline session, and [`SoundEngine::render_offline`]
//! synthesizes them: each producer's notes are mixed, run through its
//! effect chain, scaled by its gain and written equally to every channel.

mod effects;
mod envelope;
mod oscillator;
mod voice;

use crate::ast::PitchSpec;
use crate::engine::{OfflineSpec, SampleBuffer, SoundEngine, SoundProducer};
use crate::error::PlayerError;
use crate::instrument::InstrumentConfig;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Lowest octave a producer accepts
pub const MIN_OCTAVE: i8 = 0;
/// Highest octave a producer accepts
pub const MAX_OCTAVE: i8 = 8;
/// Largest offline context, in frames per channel
pub const MAX_OFFLINE_FRAMES: usize = 1 << 25;

#[derive(Debug, Clone, PartialEq)]
struct NoteRequest {
    frequency: f64,
    at_time: f64,
    length: f64,
}

#[derive(Debug)]
struct Track {
    config: InstrumentConfig,
    gain: f64,
    notes: Vec<NoteRequest>,
    disposed: bool,
}

#[derive(Debug)]
struct OfflineSession {
    spec: OfflineSpec,
    tracks: Vec<Track>,
}

type SharedSession = Rc<RefCell<OfflineSession>>;

/// Built-in synthesizer engine.
///
/// # Example
/// ```rust
/// use jianpu::engine::{OfflineSpec, SoundEngine};
/// use jianpu::synth::SynthEngine;
/// use jianpu::{InstrumentConfig, Letter, PitchSpec};
///
/// let mut engine = SynthEngine::new();
/// engine
///     .enter_offline(OfflineSpec { channels: 2, sample_rate: 8000, duration: 1.0 })
///     .unwrap();
/// let mut producer = engine.create_producer(&InstrumentConfig::default()).unwrap();
/// producer
///     .trigger_attack_release(&[PitchSpec::new(Letter::A, 4)], 0.2, 0.0)
///     .unwrap();
///
/// let buffer = engine.render_offline().unwrap();
/// engine.restore_realtime();
/// assert_eq!(buffer.len(), 8000);
/// assert!(buffer.peak() > 0.0);
/// ```
#[derive(Debug)]
pub struct SynthEngine {
    active: bool,
    session: Option<SharedSession>,
}

impl SynthEngine {
    /// An engine whose real-time context is already running.
    pub fn new() -> Self {
        Self {
            active: true,
            session: None,
        }
    }

    /// An engine that needs [`SoundEngine::request_activation`] before it
    /// reports ready.
    pub fn suspended() -> Self {
        Self {
            active: false,
            session: None,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.session.is_some()
    }
}

impl Default for SynthEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundEngine for SynthEngine {
    fn is_ready(&self) -> bool {
        self.active
    }

    fn request_activation(&mut self) -> Result<(), PlayerError> {
        log::debug!("activating synth engine");
        self.active = true;
        Ok(())
    }

    fn create_producer(
        &mut self,
        config: &InstrumentConfig,
    ) -> Result<Box<dyn SoundProducer>, PlayerError> {
        let target = match &self.session {
            Some(session) => {
                let mut s = session.borrow_mut();
                s.tracks.push(Track {
                    config: config.clone(),
                    gain: 1.0,
                    notes: Vec::new(),
                    disposed: false,
                });
                Target::Offline {
                    session: Rc::downgrade(session),
                    track: s.tracks.len() - 1,
                }
            }
            None => Target::Realtime,
        };
        log::debug!("created {:?} producer", config.synth_type);
        Ok(Box::new(SynthProducer {
            target,
            gain: 1.0,
            disposed: false,
        }))
    }

    fn enter_offline(&mut self, spec: OfflineSpec) -> Result<(), PlayerError> {
        if self.session.is_some() {
            return Err(PlayerError::Render(
                "an offline context is already open".to_string(),
            ));
        }
        let valid_duration = spec.duration.is_finite() && spec.duration >= 0.0;
        if spec.channels == 0 || spec.sample_rate == 0 || !valid_duration {
            return Err(PlayerError::Render(format!(
                "invalid offline context: {} channel(s), {} Hz, {}s",
                spec.channels, spec.sample_rate, spec.duration
            )));
        }
        if spec.duration * spec.sample_rate as f64 > MAX_OFFLINE_FRAMES as f64 {
            return Err(PlayerError::Render(format!(
                "offline context of {}s at {} Hz exceeds {} frames",
                spec.duration, spec.sample_rate, MAX_OFFLINE_FRAMES
            )));
        }
        self.session = Some(Rc::new(RefCell::new(OfflineSession {
            spec,
            tracks: Vec::new(),
        })));
        Ok(())
    }

    fn render_offline(&mut self) -> Result<SampleBuffer, PlayerError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| PlayerError::Render("no offline context is open".to_string()))?;
        let session = session.borrow();
        let spec = session.spec;
        let frames = spec.frames();
        let rate = spec.sample_rate as f64;

        let mut mix = vec![0.0f64; frames];
        for track in session.tracks.iter().filter(|t| !t.disposed) {
            let mut lane = vec![0.0f64; frames];
            for note in &track.notes {
                let start = (note.at_time * rate).round() as usize;
                if start >= frames {
                    continue;
                }
                // anything held past the end of the context is cut off anyway
                let length = note.length.min((frames - start) as f64 / rate);
                let samples = voice::render_note(&track.config, note.frequency, length, rate);
                for (slot, s) in lane[start..].iter_mut().zip(samples) {
                    *slot += s;
                }
            }
            effects::apply_chain(&track.config.effects, &mut lane, rate);
            for (m, s) in mix.iter_mut().zip(&lane) {
                *m += s * track.gain;
            }
        }

        let mono: Vec<f32> = mix.iter().map(|s| *s as f32).collect();
        let channels = vec![mono; spec.channels as usize];
        log::debug!(
            "rendered {} frame(s) from {} track(s)",
            frames,
            session.tracks.len()
        );
        SampleBuffer::from_channels(channels, spec.sample_rate)
    }

    fn restore_realtime(&mut self) {
        if self.session.take().is_some() {
            log::debug!("offline context closed");
        }
    }
}

#[derive(Debug)]
enum Target {
    Realtime,
    Offline {
        session: Weak<RefCell<OfflineSession>>,
        track: usize,
    },
}

/// Producer handed out by [`SynthEngine`].
#[derive(Debug)]
pub struct SynthProducer {
    target: Target,
    gain: f64,
    disposed: bool,
}

fn check_pitch(pitch: &PitchSpec) -> Result<(), PlayerError> {
    if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&pitch.octave) {
        return Err(PlayerError::Trigger(format!(
            "{} is outside the playable range",
            pitch
        )));
    }
    Ok(())
}

impl SoundProducer for SynthProducer {
    fn trigger_attack_release(
        &mut self,
        pitches: &[PitchSpec],
        length: f64,
        at_time: f64,
    ) -> Result<(), PlayerError> {
        if self.disposed {
            return Err(PlayerError::Trigger("producer was disposed".to_string()));
        }
        if !length.is_finite() || length < 0.0 || !at_time.is_finite() || at_time < 0.0 {
            return Err(PlayerError::Trigger(format!(
                "invalid timing: length {}, time {}",
                length, at_time
            )));
        }
        for pitch in pitches {
            check_pitch(pitch)?;
        }

        match &self.target {
            Target::Realtime => {
                log::trace!("trigger {:?} for {:.3}s at {:.3}", pitches, length, at_time);
                Ok(())
            }
            Target::Offline { session, track } => {
                let session = session.upgrade().ok_or_else(|| {
                    PlayerError::Trigger("offline context is closed".to_string())
                })?;
                let mut session = session.borrow_mut();
                let track = &mut session.tracks[*track];
                track.notes.extend(pitches.iter().map(|p| NoteRequest {
                    frequency: p.frequency(),
                    at_time,
                    length,
                }));
                Ok(())
            }
        }
    }

    fn release_all(&mut self) {
        log::trace!("release all");
    }

    fn set_volume(&mut self, gain: f64) {
        self.gain = gain.max(0.0);
        if let Target::Offline { session, track } = &self.target {
            if let Some(session) = session.upgrade() {
                session.borrow_mut().tracks[*track].gain = self.gain;
            }
        }
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
