//! Grid snapping for placing and moving structures.

use crate::shapes::Bounds;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Default grid cell size in map pixels.
pub const GRID_SIZE: f64 = 50.0;

/// Default fraction of a cell within which soft snapping engages.
pub const SOFT_SNAP_THRESHOLD: f64 = 0.25;

/// Grid snapping policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapMode {
    /// No snapping.
    None,
    /// Snap only when close to a grid line.
    #[default]
    Soft,
    /// Always snap to the nearest grid line.
    Strict,
}

impl SnapMode {
    /// Cycle to the next snap mode.
    pub fn next(self) -> Self {
        match self {
            SnapMode::None => SnapMode::Soft,
            SnapMode::Soft => SnapMode::Strict,
            SnapMode::Strict => SnapMode::None,
        }
    }

    /// Check if any snapping is enabled.
    pub fn is_enabled(self) -> bool {
        self != SnapMode::None
    }

    /// Get display name for this snap mode.
    pub fn name(self) -> &'static str {
        match self {
            SnapMode::None => "Off",
            SnapMode::Soft => "Soft",
            SnapMode::Strict => "Strict",
        }
    }
}

/// Result of a point snap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// Whether the X coordinate was snapped.
    pub snapped_x: bool,
    /// Whether the Y coordinate was snapped.
    pub snapped_y: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped_x: false,
            snapped_y: false,
        }
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

/// Grid settings used by gestures that snap as they go.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub cell_size: f64,
    pub mode: SnapMode,
    pub threshold: f64,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            cell_size: GRID_SIZE,
            mode: SnapMode::default(),
            threshold: SOFT_SNAP_THRESHOLD,
        }
    }
}

impl Grid {
    pub fn new(cell_size: f64, mode: SnapMode) -> Self {
        Self {
            cell_size,
            mode,
            ..Self::default()
        }
    }

    pub fn snap(&self, value: f64) -> f64 {
        snap_with_threshold(value, self.cell_size, self.mode, self.threshold)
    }

    pub fn snap_point(&self, point: Point) -> SnapResult {
        snap_point(point, self.cell_size, self.mode, self.threshold)
    }

    pub fn snap_bounds(&self, bounds: Bounds) -> Bounds {
        snap_bounds(bounds, self.cell_size, self.mode, self.threshold)
    }

    /// Smallest width/height a grid-bound structure may shrink to.
    pub fn min_size(&self) -> f64 {
        if self.cell_size.is_finite() && self.cell_size > 0.0 {
            self.cell_size
        } else {
            crate::shapes::MIN_PROP_SIZE
        }
    }
}

/// Snap a single coordinate using the default soft threshold.
pub fn snap(value: f64, cell_size: f64, mode: SnapMode) -> f64 {
    snap_with_threshold(value, cell_size, mode, SOFT_SNAP_THRESHOLD)
}

/// Snap a single coordinate.
///
/// `Strict` rounds to the nearest multiple of `cell_size`. `Soft` does the
/// same only when the value is closer than `cell_size * threshold` to that
/// grid line. A non-positive or non-finite cell size disables snapping.
pub fn snap_with_threshold(value: f64, cell_size: f64, mode: SnapMode, threshold: f64) -> f64 {
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return value;
    }
    let strict = (value / cell_size).round() * cell_size;
    match mode {
        SnapMode::None => value,
        SnapMode::Strict => strict,
        SnapMode::Soft => {
            if (value - strict).abs() < cell_size * threshold {
                strict
            } else {
                value
            }
        }
    }
}

/// Snap both axes of a point independently.
pub fn snap_point(point: Point, cell_size: f64, mode: SnapMode, threshold: f64) -> SnapResult {
    if !mode.is_enabled() {
        return SnapResult::none(point);
    }
    let x = snap_with_threshold(point.x, cell_size, mode, threshold);
    let y = snap_with_threshold(point.y, cell_size, mode, threshold);
    SnapResult {
        point: Point::new(x, y),
        snapped_x: x != point.x,
        snapped_y: y != point.y,
    }
}

/// Snap the origin and far corner of a bounds rectangle, flooring the size
/// to one grid cell so snapping never collapses a shape.
pub fn snap_bounds(bounds: Bounds, cell_size: f64, mode: SnapMode, threshold: f64) -> Bounds {
    if !mode.is_enabled() {
        return bounds;
    }
    let rect = bounds.to_rect();
    let x0 = snap_with_threshold(rect.x0, cell_size, mode, threshold);
    let y0 = snap_with_threshold(rect.y0, cell_size, mode, threshold);
    let x1 = snap_with_threshold(rect.x1, cell_size, mode, threshold);
    let y1 = snap_with_threshold(rect.y1, cell_size, mode, threshold);
    Bounds::new(x0, y0, x1 - x0, y1 - y0).clamped_size(cell_size)
}
