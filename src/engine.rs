//! # Sound Engine Adapter
//!
//! The player and the offline renderer never synthesize anything themselves.
//! They talk to a [`SoundEngine`], which hands out [`SoundProducer`]s built
//! from an [`InstrumentConfig`]. Any engine that honours the timing contract
//! of [`SoundProducer::trigger_attack_release`] can be plugged in.
//!
//! ## Contexts
//! An engine starts in its real-time context. [`SoundEngine::enter_offline`]
//! switches it to an isolated, non-real-time context of a fixed length;
//! producers created there write into that context only, and
//! [`SoundEngine::render_offline`] materializes the result. The caller must
//! always finish with [`SoundEngine::restore_realtime`]; the offline renderer
//! does this through a guard.

use crate::ast::PitchSpec;
use crate::error::PlayerError;
use crate::instrument::InstrumentConfig;

/// Something that can play notes with a given instrument.
pub trait SoundProducer {
    /// Start every pitch in `pitches` at `at_time` (seconds on the engine's
    /// clock) and release it `length` seconds later.
    fn trigger_attack_release(
        &mut self,
        pitches: &[PitchSpec],
        length: f64,
        at_time: f64,
    ) -> Result<(), PlayerError>;

    /// Release every voice that is still sounding.
    fn release_all(&mut self);

    /// Linear output gain (1.0 = unity).
    fn set_volume(&mut self, gain: f64);

    /// Free the producer's resources. No further calls are made afterwards.
    fn dispose(&mut self);
}

/// Parameters of an offline rendering context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfflineSpec {
    pub channels: u16,
    pub sample_rate: u32,
    /// Length of the context in seconds
    pub duration: f64,
}

impl OfflineSpec {
    /// Number of sample frames the context holds.
    pub fn frames(&self) -> usize {
        (self.duration.max(0.0) * self.sample_rate as f64).ceil() as usize
    }
}

/// Audio engine capability consumed by the player and the renderer.
pub trait SoundEngine {
    /// Whether the real-time context can produce sound right now.
    fn is_ready(&self) -> bool;

    /// Ask the engine to activate its real-time context. Activation may
    /// complete later; the host reports completion to the player.
    fn request_activation(&mut self) -> Result<(), PlayerError>;

    /// Create a producer in the current context.
    fn create_producer(
        &mut self,
        config: &InstrumentConfig,
    ) -> Result<Box<dyn SoundProducer>, PlayerError>;

    /// Switch to an isolated offline context.
    fn enter_offline(&mut self, spec: OfflineSpec) -> Result<(), PlayerError>;

    /// Render everything scheduled in the offline context.
    fn render_offline(&mut self) -> Result<SampleBuffer, PlayerError>;

    /// Return to the real-time context. Must be safe to call at any time.
    fn restore_realtime(&mut self);
}

/// Decoded, non-interleaved audio.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    /// A silent buffer of `frames` samples per channel.
    pub fn new(channels: u16, frames: usize, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: vec![vec![0.0; frames]; channels as usize],
        }
    }

    /// Wrap existing channel data. All channels must have the same length.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, PlayerError> {
        let frames = channels.first().map_or(0, Vec::len);
        if channels.iter().any(|c| c.len() != frames) {
            return Err(PlayerError::Render(
                "channels have different lengths".to_string(),
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_frames_round_up() {
        let spec = OfflineSpec {
            channels: 2,
            sample_rate: 44100,
            duration: 2.0,
        };
        assert_eq!(spec.frames(), 88200);

        let spec = OfflineSpec {
            duration: 0.00001,
            ..spec
        };
        assert_eq!(spec.frames(), 1);
    }

    #[test]
    fn test_buffer_shape() {
        let buffer = SampleBuffer::new(2, 441, 44100);
        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.len(), 441);
        assert!((buffer.duration_seconds() - 0.01).abs() < 1e-12);
        assert_eq!(buffer.peak(), 0.0);
    }

    #[test]
    fn test_from_channels_rejects_ragged() {
        assert!(SampleBuffer::from_channels(vec![vec![0.0; 3], vec![0.0; 2]], 8000).is_err());
        let buffer = SampleBuffer::from_channels(vec![vec![0.5, -0.25]], 8000).unwrap();
        assert_eq!(buffer.peak(), 0.5);
    }
}
