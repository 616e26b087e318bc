//! Live playback scheduler
//!
//! Drives a [`SoundEngine`] from a parsed score. The host owns the event
//! loop and calls [`Player::tick`] regularly; each tick fires the timeline
//! instructions whose offsets the transport has reached and, every progress
//! interval, reports how far playback has come.

use crate::engine::{SoundEngine, SoundProducer};
use crate::error::PlayerError;
use crate::instrument::InstrumentConfig;
use crate::parser::parse_with_diagnostics;
use crate::timeline::{self, Cue, InstructionKind, Timeline};

use super::clock::Clock;
use super::transport::Transport;
use super::types::{PlaybackSession, PlayerEvent, PlayerOptions, PlayerState, Readiness};

/// Work deferred until the engine finishes activating
#[derive(Debug, Clone, PartialEq)]
enum PendingAction {
    Play(String),
}

/// The single live playback controller.
///
/// Owns the engine, the clock, the transport and the active producer. Only
/// one producer exists at a time: the previous one is released and disposed
/// before its replacement is created.
///
/// # Example
/// ```rust
/// use jianpu::playback::{ManualClock, Player, PlayerEvent, PlayerOptions, PlayerState};
/// use jianpu::synth::SynthEngine;
/// use jianpu::InstrumentConfig;
///
/// let clock = ManualClock::new(0.0);
/// let mut player = Player::new(
///     SynthEngine::new(),
///     clock.clone(),
///     InstrumentConfig::default(),
///     PlayerOptions::default(),
/// );
///
/// player.play("1-1 2-1").unwrap();
/// assert_eq!(player.state(), PlayerState::Playing);
///
/// clock.advance(0.5);
/// let events = player.tick();
/// assert!(events.contains(&PlayerEvent::Finished));
/// assert_eq!(player.state(), PlayerState::Stopped);
/// ```
pub struct Player<E: SoundEngine, C: Clock> {
    engine: E,
    clock: C,
    options: PlayerOptions,
    instrument: InstrumentConfig,
    volume: f64,
    producer: Option<Box<dyn SoundProducer>>,
    transport: Transport<usize>,
    timeline: Timeline,
    /// Number of timeline instructions already fired (always a prefix)
    fired: usize,
    session: Option<PlaybackSession>,
    state: PlayerState,
    next_poll: Option<f64>,
    progress: f64,
    current_cue: Option<Cue>,
    pending: Option<PendingAction>,
}

impl<E: SoundEngine, C: Clock> Player<E, C> {
    pub fn new(engine: E, clock: C, instrument: InstrumentConfig, options: PlayerOptions) -> Self {
        Self {
            engine,
            clock,
            volume: options.volume,
            options,
            instrument,
            producer: None,
            transport: Transport::new(),
            timeline: Timeline::default(),
            fired: 0,
            session: None,
            state: PlayerState::Stopped,
            next_poll: None,
            progress: 0.0,
            current_cue: None,
            pending: None,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn instrument(&self) -> &InstrumentConfig {
        &self.instrument
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Last reported progress in 0..=1 (0 when stopped).
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn current_cue(&self) -> Option<&Cue> {
        self.current_cue.as_ref()
    }

    /// Whether a progress report is scheduled.
    pub fn is_polling(&self) -> bool {
        self.next_poll.is_some()
    }

    pub fn has_pending_action(&self) -> bool {
        self.pending.is_some()
    }

    /// Transport position in seconds.
    pub fn position(&self) -> f64 {
        self.transport.position(self.clock.now())
    }

    /// Seconds since the start of the score, as used for progress.
    pub fn elapsed(&self) -> f64 {
        match (&self.session, self.state) {
            (Some(session), PlayerState::Playing) => self.clock.now() - session.start_wall_clock,
            (Some(session), _) => session.transport_position,
            (None, _) => 0.0,
        }
    }

    /// First phase of starting playback: make sure the engine can play.
    pub fn ensure_ready(&mut self) -> Result<Readiness, PlayerError> {
        if self.engine.is_ready() {
            return Ok(Readiness::Ready);
        }
        log::info!("audio engine not active, requesting activation");
        self.engine.request_activation()?;
        Ok(Readiness::Pending)
    }

    /// Start playing `source` from the beginning, or defer it until the
    /// engine is activated.
    pub fn play(&mut self, source: &str) -> Result<Readiness, PlayerError> {
        match self.ensure_ready()? {
            Readiness::Ready => {
                self.start(source)?;
                Ok(Readiness::Ready)
            }
            Readiness::Pending => {
                self.pending = Some(PendingAction::Play(source.to_string()));
                Ok(Readiness::Pending)
            }
        }
    }

    /// Second phase: the host reports that activation finished. The deferred
    /// request runs exactly once, whether or not it succeeds.
    pub fn on_engine_activated(&mut self) -> Result<(), PlayerError> {
        let Some(action) = self.pending.take() else {
            return Ok(());
        };
        if !self.engine.is_ready() {
            log::warn!("engine reported activation but is still not ready");
            return Err(PlayerError::NotReady);
        }
        match action {
            PendingAction::Play(source) => self.start(&source),
        }
    }

    /// Play/pause button: pause while playing, resume while paused, start
    /// `source` while stopped.
    pub fn toggle(&mut self, source: &str) -> Result<Readiness, PlayerError> {
        match self.state {
            PlayerState::Playing => {
                self.pause();
                Ok(Readiness::Ready)
            }
            PlayerState::Paused => {
                self.resume();
                Ok(Readiness::Ready)
            }
            PlayerState::Stopped => self.play(source),
        }
    }

    fn start(&mut self, source: &str) -> Result<(), PlayerError> {
        self.stop();
        self.replace_producer()?;

        let (score, diagnostics) = parse_with_diagnostics(source);
        if !diagnostics.is_empty() {
            log::warn!("{} token(s) skipped while parsing", diagnostics.len());
        }
        self.timeline = timeline::build_with(&score.events, &self.options.timing);
        self.fired = 0;
        for (index, instruction) in self.timeline.instructions.iter().enumerate() {
            self.transport.schedule_at(instruction.at_time, index);
        }

        let now = self.clock.now();
        self.transport.start_at(now, 0.0);
        self.session = Some(PlaybackSession {
            start_wall_clock: now,
            total_duration: self.timeline.total_duration,
            is_playing: true,
            transport_position: 0.0,
        });
        self.state = PlayerState::Playing;
        self.next_poll = Some(now + self.options.progress_interval);

        log::info!(
            "playing {} events at {} BPM, {:.2}s",
            score.events.len(),
            score.tempo_bpm,
            self.timeline.total_duration
        );
        Ok(())
    }

    /// Suspend playback, keeping the transport position.
    pub fn pause(&mut self) {
        if self.state != PlayerState::Playing {
            return;
        }
        let now = self.clock.now();
        self.transport.pause(now);
        let position = self.transport.position(now);
        if let Some(session) = self.session.as_mut() {
            session.is_playing = false;
            session.transport_position = position;
        }
        self.next_poll = None;
        self.state = PlayerState::Paused;
        log::debug!("paused at {:.3}s", position);
    }

    /// Continue from the retained position without rescheduling.
    pub fn resume(&mut self) {
        if self.state != PlayerState::Paused {
            return;
        }
        let now = self.clock.now();
        self.transport.start(now);
        let position = self.transport.position(now);
        if let Some(session) = self.session.as_mut() {
            session.start_wall_clock = now - position;
            session.is_playing = true;
        }
        self.next_poll = Some(now + self.options.progress_interval);
        self.state = PlayerState::Playing;
        log::debug!("resumed at {:.3}s", position);
    }

    /// Cancel everything and rewind. Safe to call in any state.
    pub fn stop(&mut self) {
        self.transport.stop();
        self.transport.cancel_all();
        self.next_poll = None;
        self.progress = 0.0;
        self.current_cue = None;
        self.session = None;
        self.fired = 0;
        if let Some(producer) = self.producer.as_mut() {
            producer.release_all();
        }
        self.state = PlayerState::Stopped;
    }

    /// Switch instruments. While a score is loaded, the old producer is
    /// silenced and disposed, a new one is built, and only instructions that
    /// have not fired yet are registered again.
    ///
    /// If the new producer cannot be built, the previous instrument is kept
    /// and the player stops.
    pub fn set_instrument(&mut self, instrument: InstrumentConfig) -> Result<(), PlayerError> {
        let previous = std::mem::replace(&mut self.instrument, instrument);
        if self.state == PlayerState::Stopped {
            return Ok(());
        }

        if let Err(e) = self.replace_producer() {
            log::error!("instrument switch failed, stopping playback: {}", e);
            self.instrument = previous;
            self.stop();
            return Err(e);
        }
        self.transport.cancel_all();
        for index in self.fired..self.timeline.instructions.len() {
            self.transport
                .schedule_at(self.timeline.instructions[index].at_time, index);
        }
        log::info!(
            "instrument switched at {:.3}s, {} instruction(s) rescheduled",
            self.position(),
            self.timeline.instructions.len() - self.fired
        );
        Ok(())
    }

    /// Set the linear output gain, now and for future producers.
    pub fn set_volume(&mut self, gain: f64) {
        self.volume = gain;
        if let Some(producer) = self.producer.as_mut() {
            producer.set_volume(gain);
        }
    }

    /// Fire due instructions and report progress. Call this from the host's
    /// event loop.
    pub fn tick(&mut self) -> Vec<PlayerEvent> {
        if self.state != PlayerState::Playing {
            return Vec::new();
        }
        let now = self.clock.now();
        let start_wall_clock = self.session.map_or(now, |s| s.start_wall_clock);
        let mut events = Vec::new();

        for (at, index) in self.transport.drain_due(now) {
            self.fired = self.fired.max(index + 1);
            let instruction = &self.timeline.instructions[index];
            match &instruction.kind {
                InstructionKind::Display { cue } => {
                    self.current_cue = Some(cue.clone());
                    events.push(PlayerEvent::Cue {
                        cue: cue.clone(),
                        event_index: instruction.event_index,
                    });
                }
                InstructionKind::Sound { pitch, length } => {
                    let result = match self.producer.as_mut() {
                        Some(producer) => producer.trigger_attack_release(
                            &[*pitch],
                            *length,
                            start_wall_clock + at,
                        ),
                        None => Err(PlayerError::Trigger("no active instrument".to_string())),
                    };
                    if let Err(e) = result {
                        log::error!("failed to play {}: {}", pitch, e);
                        events.push(PlayerEvent::TriggerFailed {
                            pitch: *pitch,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(due) = self.next_poll {
            if now >= due {
                let total = self.timeline.total_duration;
                let elapsed = now - start_wall_clock;
                self.progress = if total > 0.0 {
                    (elapsed / total).min(1.0)
                } else {
                    1.0
                };
                events.push(PlayerEvent::Progress(self.progress));
                self.next_poll = Some(now + self.options.progress_interval);

                if elapsed >= total {
                    log::info!("playback finished");
                    self.stop();
                    events.push(PlayerEvent::Finished);
                }
            }
        }

        events
    }

    fn replace_producer(&mut self) -> Result<(), PlayerError> {
        if let Some(mut old) = self.producer.take() {
            old.release_all();
            old.dispose();
        }
        let mut producer = self.engine.create_producer(&self.instrument)?;
        producer.set_volume(self.volume);
        self.producer = Some(producer);
        Ok(())
    }
}

impl<E: SoundEngine, C: Clock> Drop for Player<E, C> {
    fn drop(&mut self) {
        if let Some(mut producer) = self.producer.take() {
            producer.release_all();
            producer.dispose();
        }
    }
}

/// Format seconds as `MM:SS`.
///
/// # Example
/// ```
/// use jianpu::playback::format_time;
///
/// assert_eq!(format_time(0.0), "00:00");
/// assert_eq!(format_time(75.9), "01:15");
/// ```
pub fn format_time(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{:02}:{:02}", minutes, secs)
}
