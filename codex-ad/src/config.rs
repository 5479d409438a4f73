//! codex-ad specific configuration
//!
//! Loaded from a TOML file; every field has a default so a missing or
//! partial file still yields a working director. The base volume is
//! fixed here on purpose: the transport exposes no runtime volume
//! control, only intensity derived from scene signals.

use crate::error::{Error, Result};
use codex_common::Track;
use serde::Deserialize;
use std::path::Path;

/// Audio Director configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Locked base volume; effective loop volume is `base_volume * intensity`
    pub base_volume: f32,

    /// Intensity assumed before any scene signal has been observed
    pub initial_intensity: f32,

    /// Total crossfade duration in milliseconds
    pub crossfade_ms: u64,

    /// Interval between crossfade volume steps in milliseconds
    pub fade_step_ms: u64,

    /// Gain weight applied to scene stingers (relative to base volume)
    pub stinger_gain: f32,

    /// Track to start with when no scene signal has arrived yet;
    /// defaults to the first catalog entry
    pub default_track_id: Option<String>,

    /// Ordered ambient track catalog
    pub tracks: Vec<Track>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_volume: 0.48,
            initial_intensity: 0.55,
            crossfade_ms: 2400,
            fade_step_ms: 90,
            stinger_gain: 0.8,
            default_track_id: None,
            tracks: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the fade math degenerate
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.base_volume) {
            return Err(Error::Config(format!(
                "base_volume must be in [0, 1], got {}",
                self.base_volume
            )));
        }
        if self.fade_step_ms == 0 {
            return Err(Error::Config("fade_step_ms must be non-zero".to_string()));
        }
        if self.crossfade_ms == 0 {
            return Err(Error::Config("crossfade_ms must be non-zero".to_string()));
        }
        Ok(())
    }
}
