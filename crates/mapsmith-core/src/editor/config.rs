//! Editor configuration.

use crate::camera::{MAX_SCALE, MIN_SCALE};
use crate::projection::DOOR_SNAP_DISTANCE;
use crate::snap::{GRID_SIZE, SOFT_SNAP_THRESHOLD, SnapMode};
use serde::{Deserialize, Serialize};

/// Tunables for an editor session.
///
/// Every field has a default, so a config file only needs to name what it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Grid cell size for new maps, in map pixels.
    pub grid_size: f64,
    /// Snap mode for new maps.
    pub snap_mode: SnapMode,
    /// Fraction of a cell within which soft snapping engages.
    pub soft_snap_threshold: f64,
    /// How far from a wall a door click may land and still attach.
    pub door_snap_distance: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Multiplier per wheel notch.
    pub zoom_step: f64,
    /// Pick tolerance in screen pixels.
    pub hit_tolerance: f64,
    /// Marker pick radius in screen pixels.
    pub marker_radius: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            snap_mode: SnapMode::default(),
            soft_snap_threshold: SOFT_SNAP_THRESHOLD,
            door_snap_distance: DOOR_SNAP_DISTANCE,
            min_zoom: MIN_SCALE,
            max_zoom: MAX_SCALE,
            zoom_step: 1.1,
            hit_tolerance: 6.0,
            marker_radius: 12.0,
        }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl EditorConfig {
    /// Parse a JSON config, then sanitize it.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::sanitized)
    }

    /// Replace out-of-range values with defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !positive(self.grid_size) {
            log::warn!("Invalid grid_size {}, using {}", self.grid_size, defaults.grid_size);
            self.grid_size = defaults.grid_size;
        }
        if !(self.soft_snap_threshold.is_finite() && (0.0..=0.5).contains(&self.soft_snap_threshold)) {
            log::warn!("Invalid soft_snap_threshold {}", self.soft_snap_threshold);
            self.soft_snap_threshold = defaults.soft_snap_threshold;
        }
        if !positive(self.door_snap_distance) {
            self.door_snap_distance = defaults.door_snap_distance;
        }
        if !positive(self.min_zoom) || !positive(self.max_zoom) || self.min_zoom > self.max_zoom {
            log::warn!(
                "Invalid zoom range [{}, {}], using defaults",
                self.min_zoom,
                self.max_zoom
            );
            self.min_zoom = defaults.min_zoom;
            self.max_zoom = defaults.max_zoom;
        }
        let min_zoom = self.min_zoom.clamp(MIN_SCALE, MAX_SCALE);
        let max_zoom = self.max_zoom.clamp(MIN_SCALE, MAX_SCALE);
        if (min_zoom, max_zoom) != (self.min_zoom, self.max_zoom) {
            log::warn!(
                "Zoom range [{}, {}] clamped to [{}, {}]",
                self.min_zoom,
                self.max_zoom,
                min_zoom,
                max_zoom
            );
            self.min_zoom = min_zoom;
            self.max_zoom = max_zoom;
        }
        if !positive(self.zoom_step) || self.zoom_step == 1.0 {
            self.zoom_step = defaults.zoom_step;
        }
        if !self.hit_tolerance.is_finite() || self.hit_tolerance < 0.0 {
            self.hit_tolerance = defaults.hit_tolerance;
        }
        if !self.marker_radius.is_finite() || self.marker_radius < 0.0 {
            self.marker_radius = defaults.marker_radius;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EditorConfig::from_json(r#"{"grid_size": 32, "snap_mode": "strict"}"#).unwrap();
        assert_eq!(config.grid_size, 32.0);
        assert_eq!(config.snap_mode, SnapMode::Strict);
        assert_eq!(config.door_snap_distance, DOOR_SNAP_DISTANCE);
        assert_eq!(config.max_zoom, MAX_SCALE);
    }

    #[test]
    fn test_invalid_values_are_replaced() {
        let config =
            EditorConfig::from_json(r#"{"grid_size": -5, "min_zoom": 3, "max_zoom": 2}"#).unwrap();
        assert_eq!(config.grid_size, GRID_SIZE);
        assert_eq!(config.min_zoom, MIN_SCALE);
        assert_eq!(config.max_zoom, MAX_SCALE);
    }

    #[test]
    fn test_zoom_range_is_clamped() {
        let config = EditorConfig::from_json(r#"{"min_zoom": 0.01, "max_zoom": 50}"#).unwrap();
        assert_eq!(config.min_zoom, MIN_SCALE);
        assert_eq!(config.max_zoom, MAX_SCALE);

        let config = EditorConfig::from_json(r#"{"min_zoom": 0.5, "max_zoom": 2}"#).unwrap();
        assert_eq!((config.min_zoom, config.max_zoom), (0.5, 2.0));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(EditorConfig::from_json("{grid_size:").is_err());
    }
}
