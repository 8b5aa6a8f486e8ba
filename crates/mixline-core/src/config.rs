//! Engine configuration.
//!
//! Every tunable constant of the timeline engine lives here so hosts can
//! override them from a JSON document. Missing fields fall back to the
//! defaults below.

use crate::error::{MixlineError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pixels per second at zoom level 1.0.
    pub base_pixels_per_second: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Multiplier applied by a single zoom-in/zoom-out step.
    pub zoom_step: f64,

    /// Waveform tile width budget in device pixels. Tiles are narrower in
    /// logical pixels on high-density displays.
    pub tile_width: u32,
    /// Global tile budget shared by every track.
    pub max_cached_tiles: usize,
    /// Horizontal distance between bar starts in device pixels.
    pub bar_stride: f32,
    /// Frequency-color bars quieter than this are not drawn.
    pub min_peak: f32,

    /// Pointer displacement (px) before a press becomes a drag.
    pub drag_threshold: f64,
    /// Delay before an edit is handed to the persistence collaborator.
    pub commit_debounce_ms: u64,
    /// Shortest region that can become an active selection.
    pub min_region_seconds: f64,
    /// Minimum distance between trim start and trim end.
    pub min_trim_gap: f64,
    /// Crossfade used for tracks that do not define their own.
    pub default_crossfade_seconds: f64,

    /// Fraction of the viewport on each side the playhead may not enter.
    pub follow_margin: f64,
    /// Where the playhead lands (fraction of viewport width) after a follow scroll.
    pub follow_target: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_pixels_per_second: 10.0,
            min_zoom: 0.25,
            max_zoom: 50.0,
            zoom_step: 1.25,
            tile_width: 4096,
            max_cached_tiles: 48,
            bar_stride: 3.0,
            min_peak: 0.01,
            drag_threshold: 3.0,
            commit_debounce_ms: 300,
            min_region_seconds: 0.5,
            min_trim_gap: 1.0,
            default_crossfade_seconds: 8.0,
            follow_margin: 0.15,
            follow_target: 0.30,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON bytes and validate it.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| MixlineError::Serialization(format!("Invalid engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| MixlineError::Serialization(format!("Failed to serialize config: {}", e)))
    }

    /// Load and validate a configuration file.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    /// Reject values that would make the engine divide by zero or loop forever.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_pixels_per_second > 0.0) {
            return Err(MixlineError::Config(
                "base_pixels_per_second must be positive".into(),
            ));
        }
        if !(self.min_zoom > 0.0) || self.min_zoom > self.max_zoom {
            return Err(MixlineError::Config(format!(
                "zoom range [{}, {}] is invalid",
                self.min_zoom, self.max_zoom
            )));
        }
        if !(self.zoom_step > 1.0) {
            return Err(MixlineError::Config("zoom_step must be greater than 1".into()));
        }
        if self.tile_width == 0 || self.max_cached_tiles == 0 {
            return Err(MixlineError::Config(
                "tile_width and max_cached_tiles must be non-zero".into(),
            ));
        }
        if !(self.bar_stride >= 1.0) {
            return Err(MixlineError::Config("bar_stride must be at least 1px".into()));
        }
        if self.drag_threshold < 0.0 || self.min_region_seconds < 0.0 || self.min_trim_gap < 0.0 {
            return Err(MixlineError::Config(
                "thresholds must not be negative".into(),
            ));
        }
        if !(0.0..0.5).contains(&self.follow_margin) || !(0.0..1.0).contains(&self.follow_target) {
            return Err(MixlineError::Config(
                "follow_margin must be in [0, 0.5) and follow_target in [0, 1)".into(),
            ));
        }
        Ok(())
    }

    /// Debounce delay as a [`Duration`].
    pub fn commit_debounce(&self) -> Duration {
        Duration::from_millis(self.commit_debounce_ms)
    }

    /// Clamp a zoom level into the configured range.
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.min_zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Pixels per second for a zoom level.
    pub fn pixels_per_second(&self, zoom: f64) -> f64 {
        self.base_pixels_per_second * self.clamp_zoom(zoom)
    }
}
