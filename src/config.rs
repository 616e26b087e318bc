//! Player configuration read from YAML.
//!
//! ```yaml
//! base-time-unit: 0.25      # seconds per duration unit
//! articulation: 0.95        # fraction of the span a note sounds
//! sample-rate: 44100
//! channels: 2
//! tail-seconds: 1.0         # silence after the last event when rendering
//! progress-interval-ms: 100
//! volume: 0.8
//! instrument: piano         # a built-in instrument name
//! ```
//!
//! Every key is optional.

use crate::error::PlayerError;
use crate::instrument::{InstrumentConfig, BUILTIN_INSTRUMENTS};
use crate::playback::PlayerOptions;
use crate::render::RenderSettings;
use crate::timeline::{TimingSettings, ARTICULATION, BASE_TIME_UNIT_SECONDS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Raw YAML as written by the user, before validation
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    base_time_unit: Option<f64>,
    articulation: Option<f64>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    tail_seconds: Option<f64>,
    progress_interval_ms: Option<u64>,
    volume: Option<f64>,
    instrument: Option<String>,
}

/// Validated player configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlayerConfig {
    pub base_time_unit: f64,
    pub articulation: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub tail_seconds: f64,
    pub progress_interval_ms: u64,
    pub volume: f64,
    pub instrument: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            base_time_unit: BASE_TIME_UNIT_SECONDS,
            articulation: ARTICULATION,
            sample_rate: 44100,
            channels: 2,
            tail_seconds: 1.0,
            progress_interval_ms: 100,
            volume: 0.8,
            instrument: "piano".to_string(),
        }
    }
}

impl PlayerConfig {
    /// Parse and validate YAML.
    ///
    /// # Example
    /// ```
    /// use jianpu::config::PlayerConfig;
    ///
    /// let config = PlayerConfig::from_yaml("volume: 0.5\ninstrument: flute\n").unwrap();
    /// assert_eq!(config.volume, 0.5);
    /// assert_eq!(config.sample_rate, 44100);
    /// ```
    pub fn from_yaml(content: &str) -> Result<Self, PlayerError> {
        let raw: RawConfig = if content.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| PlayerError::Config(e.to_string()))?
        };
        let defaults = Self::default();

        let base_time_unit = raw.base_time_unit.unwrap_or(defaults.base_time_unit);
        if !(base_time_unit.is_finite() && base_time_unit > 0.0) {
            return Err(PlayerError::Config(format!(
                "base-time-unit must be positive, got {}",
                base_time_unit
            )));
        }
        let articulation = raw.articulation.unwrap_or(defaults.articulation);
        if !(articulation > 0.0 && articulation <= 1.0) {
            return Err(PlayerError::Config(format!(
                "articulation must be in (0, 1], got {}",
                articulation
            )));
        }
        let sample_rate = raw.sample_rate.unwrap_or(defaults.sample_rate);
        if sample_rate == 0 {
            return Err(PlayerError::Config("sample-rate must be positive".to_string()));
        }
        let channels = raw.channels.unwrap_or(defaults.channels);
        if channels == 0 {
            return Err(PlayerError::Config("channels must be positive".to_string()));
        }
        let tail_seconds = raw.tail_seconds.unwrap_or(defaults.tail_seconds);
        if !(tail_seconds.is_finite() && tail_seconds >= 0.0) {
            return Err(PlayerError::Config(format!(
                "tail-seconds must not be negative, got {}",
                tail_seconds
            )));
        }
        let progress_interval_ms = raw.progress_interval_ms.unwrap_or(defaults.progress_interval_ms);
        if progress_interval_ms == 0 {
            return Err(PlayerError::Config(
                "progress-interval-ms must be positive".to_string(),
            ));
        }
        let volume = raw.volume.unwrap_or(defaults.volume);
        if !(volume.is_finite() && volume >= 0.0) {
            return Err(PlayerError::Config(format!(
                "volume must not be negative, got {}",
                volume
            )));
        }
        let instrument = raw.instrument.unwrap_or(defaults.instrument);
        if InstrumentConfig::builtin(&instrument).is_none() {
            return Err(PlayerError::Config(format!(
                "unknown instrument '{}', expected one of: {}",
                instrument,
                BUILTIN_INSTRUMENTS.join(", ")
            )));
        }

        Ok(Self {
            base_time_unit,
            articulation,
            sample_rate,
            channels,
            tail_seconds,
            progress_interval_ms,
            volume,
            instrument,
        })
    }

    /// Read a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PlayerError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&content)?;
        log::debug!("loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn timing(&self) -> TimingSettings {
        TimingSettings {
            base_unit: self.base_time_unit,
            articulation: self.articulation,
        }
    }

    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            timing: self.timing(),
            progress_interval: self.progress_interval_ms as f64 / 1000.0,
            volume: self.volume,
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            sample_rate: self.sample_rate,
            channels: self.channels,
            tail_seconds: self.tail_seconds,
            timing: self.timing(),
        }
    }

    /// The configured built-in instrument.
    pub fn instrument_config(&self) -> Result<InstrumentConfig, PlayerError> {
        InstrumentConfig::builtin(&self.instrument)
            .ok_or_else(|| PlayerError::Config(format!("unknown instrument '{}'", self.instrument)))
    }
}
