//! Structure (room/wall) shape definitions.

mod structure;

pub use structure::{MIN_PROP_SIZE, Structure};

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Unique identifier for structures.
pub type StructureId = u64;

/// Geometric kind of a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Polygon,
}

/// What a structure represents on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureKind {
    Wall,
    #[default]
    Room,
    Water,
}

impl StructureKind {
    /// Display name for the layers panel.
    pub fn name(self) -> &'static str {
        match self {
            StructureKind::Wall => "Wall",
            StructureKind::Room => "Room",
            StructureKind::Water => "Water",
        }
    }
}

/// Axis-aligned bounding box stored as origin plus size.
///
/// This mirrors the persisted `{x, y, width, height}` layout. Use
/// [`Bounds::to_rect`] when a kurbo rectangle is more convenient.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Build bounds from two arbitrary corners (e.g. a drag rectangle).
    pub fn from_points(a: Point, b: Point) -> Self {
        Self::from_rect(Rect::from_points(a, b))
    }

    /// Build bounds from a kurbo rectangle, normalizing negative extents.
    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self::new(rect.x0, rect.y0, rect.width(), rect.height())
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn origin(self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Move the origin, keeping the size.
    pub fn with_origin(self, origin: Point) -> Self {
        Self::new(origin.x, origin.y, self.width, self.height)
    }

    pub fn translated(self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }

    /// Floor width and height to `min_size`. Negative or NaN extents become `min_size`.
    pub fn clamped_size(self, min_size: f64) -> Self {
        let floor = |v: f64| if v.is_nan() { min_size } else { v.max(min_size) };
        Self::new(self.x, self.y, floor(self.width), floor(self.height))
    }

    pub fn contains(self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn is_zero_area(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

impl From<Rect> for Bounds {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl From<Bounds> for Rect {
    fn from(bounds: Bounds) -> Self {
        bounds.to_rect()
    }
}
