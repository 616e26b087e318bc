//! # Offline Renderer
//!
//! Renders a whole score into a [`SampleBuffer`] without touching the live
//! player. The engine is switched to an isolated offline context for the
//! duration of the render and is always switched back, including when the
//! render fails.

use crate::ast::Score;
use crate::engine::{OfflineSpec, SampleBuffer, SoundEngine};
use crate::error::PlayerError;
use crate::instrument::InstrumentConfig;
use crate::timeline::{self, Timeline, TimingSettings};
use std::ops::{Deref, DerefMut};

/// Longest context, in seconds, that [`render_to_buffer`] will open.
pub const MAX_RENDER_SECONDS: f64 = 600.0;

/// Output format and timing of an offline render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub sample_rate: u32,
    pub channels: u16,
    /// Silence appended after the last event so release tails are kept
    pub tail_seconds: f64,
    pub timing: TimingSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            tail_seconds: 1.0,
            timing: TimingSettings::default(),
        }
    }
}

/// Holds an engine in its offline context and restores the real-time
/// context on drop.
pub struct OfflineScope<'a, E: SoundEngine> {
    engine: &'a mut E,
}

impl<'a, E: SoundEngine> OfflineScope<'a, E> {
    pub fn enter(engine: &'a mut E, spec: OfflineSpec) -> Result<Self, PlayerError> {
        if let Err(e) = engine.enter_offline(spec) {
            engine.restore_realtime();
            return Err(e);
        }
        Ok(Self { engine })
    }
}

impl<E: SoundEngine> Deref for OfflineScope<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.engine
    }
}

impl<E: SoundEngine> DerefMut for OfflineScope<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.engine
    }
}

impl<E: SoundEngine> Drop for OfflineScope<'_, E> {
    fn drop(&mut self) {
        self.engine.restore_realtime();
    }
}

/// Render `score` with `config` at linear gain `volume`.
///
/// The context is `total + tail_seconds` long and may not exceed
/// [`MAX_RENDER_SECONDS`]. Every sound instruction is triggered up front at
/// its explicit offset. Any failure comes back as [`PlayerError::Render`].
///
/// # Example
/// ```rust
/// use jianpu::render::{render_to_buffer, RenderSettings};
/// use jianpu::synth::SynthEngine;
/// use jianpu::{parse, InstrumentConfig};
///
/// let score = parse("1-1 2-1 3-2");
/// let mut engine = SynthEngine::new();
/// let settings = RenderSettings { sample_rate: 8000, ..RenderSettings::default() };
/// let buffer = render_to_buffer(&mut engine, &score, &InstrumentConfig::default(), 0.8, &settings)
///     .unwrap();
///
/// // one second of score plus one second of tail
/// assert_eq!(buffer.len(), 16000);
/// assert_eq!(buffer.num_channels(), 2);
/// ```
pub fn render_to_buffer<E: SoundEngine>(
    engine: &mut E,
    score: &Score,
    config: &InstrumentConfig,
    volume: f64,
    settings: &RenderSettings,
) -> Result<SampleBuffer, PlayerError> {
    let timeline = timeline::build_with(&score.events, &settings.timing);
    let spec = OfflineSpec {
        channels: settings.channels,
        sample_rate: settings.sample_rate,
        duration: timeline.total_duration + settings.tail_seconds,
    };
    log::info!(
        "rendering {:.2}s at {} Hz, {} channel(s)",
        spec.duration,
        spec.sample_rate,
        spec.channels
    );
    if !spec.duration.is_finite() || spec.duration > MAX_RENDER_SECONDS {
        log::error!("render failed: {:.2}s score is too long", spec.duration);
        return Err(PlayerError::Render(format!(
            "{}s exceeds the {}s render limit",
            spec.duration, MAX_RENDER_SECONDS
        )));
    }

    let result = OfflineScope::enter(engine, spec)
        .and_then(|mut scope| render_timeline(&mut *scope, &timeline, config, volume));
    result.map_err(|e| {
        log::error!("render failed: {}", e);
        match e {
            PlayerError::Render(_) => e,
            other => PlayerError::Render(other.to_string()),
        }
    })
}

fn render_timeline<E: SoundEngine>(
    engine: &mut E,
    timeline: &Timeline,
    config: &InstrumentConfig,
    volume: f64,
) -> Result<SampleBuffer, PlayerError> {
    let mut producer = engine.create_producer(config)?;
    producer.set_volume(volume);
    let triggered = timeline
        .sounds()
        .try_for_each(|(at, pitch, length)| producer.trigger_attack_release(&[pitch], length, at));
    let buffer = triggered.and_then(|_| engine.render_offline());
    producer.dispose();
    buffer
}
