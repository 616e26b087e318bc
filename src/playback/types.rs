//! Playback state and event type definitions

use crate::ast::PitchSpec;
use crate::timeline::{Cue, TimingSettings};
use serde::Serialize;

/// Live player state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
}

/// Result of asking the engine to be ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The engine can play now; the request was carried out.
    Ready,
    /// Activation was requested; the request runs once the host reports
    /// completion through `Player::on_engine_activated`.
    Pending,
}

/// Bookkeeping for the playback currently in progress.
///
/// # Fields
/// - `start_wall_clock`: clock time corresponding to score time 0
/// - `total_duration`: length of the timeline in seconds
/// - `transport_position`: position retained at the last pause
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    pub start_wall_clock: f64,
    pub total_duration: f64,
    pub is_playing: bool,
    pub transport_position: f64,
}

/// What happened during a `Player::tick`.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// An event became current
    Cue { cue: Cue, event_index: usize },
    /// Progress in 0..=1
    Progress(f64),
    /// A single note could not be played; playback continues
    TriggerFailed { pitch: PitchSpec, message: String },
    /// The end of the score was reached and the player stopped
    Finished,
}

/// Player tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerOptions {
    pub timing: TimingSettings,
    /// Seconds between progress reports
    pub progress_interval: f64,
    /// Initial linear gain
    pub volume: f64,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            timing: TimingSettings::default(),
            progress_interval: 0.1,
            volume: 0.8,
        }
    }
}
