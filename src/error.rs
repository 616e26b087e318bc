//! # Error Types
//!
//! This module defines the error type shared by every part of the player.
//!
//! Most problems in a score never surface as an `Err`: the parser drops a bad
//! token, records a [`Diagnostic`](crate::parser::Diagnostic) and keeps going,
//! and the live player logs a failed note and moves on to the next one. The
//! variants below are what remains when an operation as a whole cannot finish.
//!
//! ## Error Types
//! - `Parse` - Token-level problem with line and column (used for diagnostics)
//! - `Trigger` - The sound producer rejected a single note
//! - `NotReady` - The audio engine has not been activated yet
//! - `Render` - An offline render attempt failed
//! - `Preset` - Invalid preset name or preset payload
//! - `Config` - Invalid player configuration
//! - `Io` / `Json` - Wrapped I/O and serialization failures
//!
//! ## Usage
//! ```rust
//! use jianpu::{render_score_to_wav, InstrumentConfig, PlayerError};
//!
//! match render_score_to_wav("1-1 2-1", &InstrumentConfig::default(), 0.8) {
//!     Ok(bytes) => println!("{} bytes of WAV", bytes.len()),
//!     Err(PlayerError::Render(message)) => eprintln!("render failed: {}", message),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    /// Token-level parse problem with location information.
    ///
    /// The parser never returns this variant; it is the display form of a
    /// dropped token.
    ///
    /// # Example
    /// ```
    /// # use jianpu::PlayerError;
    /// let err = PlayerError::Parse {
    ///     line: 2,
    ///     column: 7,
    ///     message: "unknown degree '15'".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Parse error at line 2, column 7: unknown degree '15'");
    /// ```
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// The sound producer refused a note.
    ///
    /// # Example
    /// ```
    /// # use jianpu::PlayerError;
    /// let err = PlayerError::Trigger("pitch C12 is out of range".to_string());
    /// assert_eq!(err.to_string(), "Cannot play note: pitch C12 is out of range");
    /// ```
    #[error("Cannot play note: {0}")]
    Trigger(String),

    /// The audio engine needs an activation step before it can play.
    #[error("Audio engine is not activated")]
    NotReady,

    /// An offline render attempt failed. The real-time context has already
    /// been restored when this is returned.
    #[error("Render failed: {0}")]
    Render(String),

    #[error("Invalid preset: {0}")]
    Preset(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
