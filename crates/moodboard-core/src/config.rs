//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading a [`CanvasConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid zoom settings: {0}")]
    Zoom(String),
}

/// Zoom behaviour for wheel gestures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomSettings {
    /// Smallest allowed scale.
    pub min_scale: f64,
    /// Largest allowed scale.
    pub max_scale: f64,
    /// Scale change per unit of wheel delta.
    pub sensitivity: f64,
    /// Keep the canvas point under the cursor fixed while zooming.
    ///
    /// Off by default: zoom scales from the transform origin.
    pub anchor_to_cursor: bool,
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 5.0,
            sensitivity: 0.001,
            anchor_to_cursor: false,
        }
    }
}

impl ZoomSettings {
    /// Check that the limits are finite, positive and ordered, and that
    /// the sensitivity is finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_scale.is_finite() && self.max_scale.is_finite() && self.min_scale > 0.0) {
            return Err(ConfigError::Zoom(format!(
                "scale limits must be finite and positive, got {}..{}",
                self.min_scale, self.max_scale
            )));
        }
        if self.min_scale > self.max_scale {
            return Err(ConfigError::Zoom(format!(
                "min_scale {} is greater than max_scale {}",
                self.min_scale, self.max_scale
            )));
        }
        if !self.sensitivity.is_finite() {
            return Err(ConfigError::Zoom(format!("sensitivity {} is not finite", self.sensitivity)));
        }
        Ok(())
    }

    /// The scale limits, or the default limits if these are invalid.
    pub fn limits(&self) -> (f64, f64) {
        if self.validate().is_ok() {
            (self.min_scale, self.max_scale)
        } else {
            let defaults = Self::default();
            (defaults.min_scale, defaults.max_scale)
        }
    }

    /// Clamp a scale to the limits. Never panics, whatever the settings hold.
    pub fn clamp(&self, scale: f64) -> f64 {
        let (min, max) = self.limits();
        if scale.is_nan() {
            return min;
        }
        scale.clamp(min, max)
    }
}

/// Tunables for the canvas engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub zoom: ZoomSettings,
    /// Pointer travel (screen px) before a press on an item becomes a drag.
    pub drag_activation_distance: f64,
    /// Max interval between two presses counted as a double-click.
    pub double_click_ms: u64,
    /// Max pointer travel (screen px) between two presses of a double-click.
    pub double_click_distance: f64,
    /// Quiet period before a debounced autosave fires.
    pub autosave_delay_ms: u64,
    /// Longest edge of a captured board thumbnail, in pixels.
    pub thumbnail_max_edge: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomSettings::default(),
            drag_activation_distance: 5.0,
            double_click_ms: 500,
            double_click_distance: 5.0,
            autosave_delay_ms: 1000,
            thumbnail_max_edge: 640,
        }
    }
}

impl CanvasConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn double_click_interval(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }

    /// Parse a config from JSON. Missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.zoom.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
