//! # Playback Module
//!
//! Live, pausable playback of a score against a sound engine.
//!
//! ## Sub-modules
//! - `types` - PlayerState, PlaybackSession, PlayerEvent, PlayerOptions
//! - `transport` - Offset-ordered queue with a resumable position
//! - `clock` - Clock trait, SystemClock and ManualClock
//! - `player` - The Player state machine
//!
//! ## States
//! ```text
//!            play / toggle                 pause / toggle
//!  STOPPED ─────────────────▶ PLAYING ─────────────────▶ PAUSED
//!     ▲                        │   ▲                        │
//!     │  stop / end of score   │   └────── resume / toggle ─┘
//!     └────────────────────────┘
//!     ▲                                                     │
//!     └──────────────────────── stop ───────────────────────┘
//! ```
//!
//! ## Timing
//! The transport holds every timeline instruction at its absolute offset and
//! is the source of truth for when notes fire. The progress poll only feeds
//! the display: every `progress_interval` it reports `elapsed / total`
//! (capped at 1) and stops the player once the end is reached.
//!
//! ## Engine activation
//! Engines that need a user gesture before producing sound report
//! `is_ready() == false`. [`Player::play`] then requests activation and
//! returns [`Readiness::Pending`]; when the host calls
//! [`Player::on_engine_activated`] the deferred request runs exactly once.
//!
//! ## Instrument switches
//! [`Player::set_instrument`] silences and disposes the current producer,
//! builds a new one and re-registers only the instructions that have not
//! fired yet. Nothing before the switch point is played again, and nothing
//! after it is lost.

mod clock;
mod player;
mod transport;
mod types;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use player::{format_time, Player};
pub use transport::{Transport, TransportState};
pub use types::{PlaybackSession, PlayerEvent, PlayerOptions, PlayerState, Readiness};
