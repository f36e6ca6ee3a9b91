//! Camera module for the world/screen coordinate transform.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest allowed scale factor.
pub const MIN_SCALE: f64 = 0.1;
/// Largest allowed scale factor.
pub const MAX_SCALE: f64 = 4.0;

/// Camera holds the uniform scale and screen offset of the map view.
///
/// `world_to_screen(p) = p * scale + offset` and
/// `screen_to_world(p) = (p - offset) / scale`. Nothing else in the editor
/// caches screen positions; they are always re-derived from these two fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Screen-space translation (pan).
    pub offset: Vec2,
    /// Uniform scale factor, always within `[min_scale, max_scale]`.
    pub scale: f64,
    /// Minimum allowed scale.
    pub min_scale: f64,
    /// Maximum allowed scale.
    pub max_scale: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera with custom scale limits.
    ///
    /// Limits are kept inside `[MIN_SCALE, MAX_SCALE]` with `min <= max`.
    pub fn with_limits(min_scale: f64, max_scale: f64) -> Self {
        let limit = |value: f64, fallback: f64| {
            if value.is_nan() {
                fallback
            } else {
                value.clamp(MIN_SCALE, MAX_SCALE)
            }
        };
        let min_scale = limit(min_scale, MIN_SCALE);
        let max_scale = limit(max_scale, MAX_SCALE).max(min_scale);
        Self {
            offset: Vec2::ZERO,
            scale: 1.0_f64.clamp(min_scale, max_scale),
            min_scale,
            max_scale,
        }
    }

    /// Affine transform from world to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Affine transform from screen to world coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Convert a length in screen pixels to world units.
    pub fn screen_distance_to_world(&self, distance: f64) -> f64 {
        distance / self.scale
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Set the scale to `new_scale`, keeping the world point under
    /// `cursor_screen` fixed on screen.
    pub fn zoom_at(&mut self, cursor_screen: Point, new_scale: f64) {
        if !new_scale.is_finite() {
            return;
        }
        let new_scale = new_scale.clamp(self.min_scale, self.max_scale);
        let world_under_cursor = self.screen_to_world(cursor_screen);

        self.scale = new_scale;
        // offset' = cursor - world * s'
        self.offset = cursor_screen.to_vec2() - world_under_cursor.to_vec2() * new_scale;
    }

    /// Multiply the scale by `factor` around the cursor (mouse wheel zoom).
    pub fn zoom_by(&mut self, cursor_screen: Point, factor: f64) {
        self.zoom_at(cursor_screen, self.scale * factor);
    }

    /// Reset camera to default position and scale.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.scale = 1.0_f64.clamp(self.min_scale, self.max_scale);
    }

    /// Fit the camera to show the given bounding box.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Size, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }

        let padded_viewport = Size::new(
            (viewport.width - padding * 2.0).max(1.0),
            (viewport.height - padding * 2.0).max(1.0),
        );

        let scale_x = padded_viewport.width / bounds.width();
        let scale_y = padded_viewport.height / bounds.height();
        self.scale = scale_x.min(scale_y).clamp(self.min_scale, self.max_scale);

        let bounds_center = bounds.center();
        let viewport_center = Point::new(viewport.width / 2.0, viewport.height / 2.0);

        self.offset = Vec2::new(
            viewport_center.x - bounds_center.x * self.scale,
            viewport_center.y - bounds_center.y * self.scale,
        );
    }
}
