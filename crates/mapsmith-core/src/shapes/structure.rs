//! Room and wall structures.

use super::{Bounds, ShapeKind, StructureId, StructureKind};
use crate::error::{EditError, EditResult};
use crate::projection;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Minimum width/height for free-form shapes that are not grid bound.
pub const MIN_PROP_SIZE: f64 = 1.0;

/// A room, wall or water area on the map.
///
/// Polygon vertices are stored relative to `bounds` origin, so translating a
/// structure only touches `bounds.x` and `bounds.y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: StructureId,
    #[serde(rename = "shape")]
    pub shape_kind: ShapeKind,
    pub bounds: Bounds,
    /// Bounds-relative vertices (polygons only).
    #[serde(rename = "points", default)]
    pub vertices: Option<Vec<Point>>,
    #[serde(default)]
    pub kind: StructureKind,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_finalized")]
    pub finalized: bool,
    /// Optional display name shown in the layers panel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

fn default_finalized() -> bool {
    true
}

impl Structure {
    fn with_shape(id: StructureId, shape_kind: ShapeKind, bounds: Bounds) -> Self {
        Self {
            id,
            shape_kind,
            bounds,
            vertices: None,
            kind: StructureKind::default(),
            locked: false,
            finalized: true,
            name: None,
        }
    }

    /// Create an axis-aligned rectangle.
    pub fn rectangle(id: StructureId, bounds: Bounds) -> Self {
        Self::with_shape(id, ShapeKind::Rectangle, bounds.clamped_size(0.0))
    }

    /// Create a circle inscribed in a bounding square.
    ///
    /// The square side is the larger of the given width and height, so the
    /// radius is always `width / 2 == height / 2`.
    pub fn circle(id: StructureId, bounds: Bounds) -> Self {
        let bounds = square(bounds.clamped_size(0.0));
        Self::with_shape(id, ShapeKind::Circle, bounds)
    }

    /// Create a polygon from absolute vertices.
    ///
    /// The bounds become the vertex envelope and the vertices are stored
    /// relative to its origin. The polygon is left unfinalized when it has
    /// fewer than three vertices.
    pub fn polygon(id: StructureId, vertices: &[Point]) -> Self {
        let bounds = envelope(vertices);
        let origin = bounds.origin().to_vec2();
        let relative = vertices.iter().map(|&v| v - origin).collect::<Vec<_>>();
        let mut structure = Self::with_shape(id, ShapeKind::Polygon, bounds);
        structure.finalized = relative.len() >= 3;
        structure.vertices = Some(relative);
        structure
    }

    /// Builder-style setter for the structure kind.
    pub fn with_kind(mut self, kind: StructureKind) -> Self {
        self.kind = kind;
        self
    }

    /// Builder-style setter for the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_wall(&self) -> bool {
        self.kind == StructureKind::Wall
    }

    /// Display label for the layers panel.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{} {}", self.kind.name(), self.id),
        }
    }

    pub fn origin(&self) -> Point {
        self.bounds.origin()
    }

    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    /// Radius of a circle structure (half the bounding width).
    pub fn radius(&self) -> f64 {
        self.bounds.width / 2.0
    }

    /// Bounds-relative vertices, if this is a polygon with any.
    pub fn relative_vertices(&self) -> &[Point] {
        self.vertices.as_deref().unwrap_or(&[])
    }

    /// Vertices in world coordinates.
    pub fn absolute_vertices(&self) -> Vec<Point> {
        let origin = self.origin().to_vec2();
        self.relative_vertices().iter().map(|&v| v + origin).collect()
    }

    /// Whether this structure should be treated as a true polygon.
    ///
    /// Polygons with fewer than three vertices behave like their bounds.
    pub fn has_polygon_outline(&self) -> bool {
        self.shape_kind == ShapeKind::Polygon && self.relative_vertices().len() >= 3
    }

    /// Translate the structure. Vertices follow because they are relative.
    pub fn translate(&mut self, delta: Vec2) {
        self.bounds = self.bounds.translated(delta);
    }

    /// Move the bounds origin to `origin`.
    pub fn set_origin(&mut self, origin: Point) {
        self.bounds = self.bounds.with_origin(origin);
    }

    /// Resize to `new_bounds`, flooring width/height to `min_size`.
    ///
    /// Polygon vertices are rescaled per axis so the outline keeps its
    /// relative shape under non-uniform scaling. Circles stay square.
    pub fn resize(&mut self, new_bounds: Bounds, min_size: f64) {
        let mut new_bounds = new_bounds.clamped_size(min_size);
        if self.shape_kind == ShapeKind::Circle {
            new_bounds = square(new_bounds);
        }

        if let Some(vertices) = self.vertices.as_mut() {
            let old = self.bounds;
            let sx = scale_factor(old.width, new_bounds.width);
            let sy = scale_factor(old.height, new_bounds.height);
            for v in vertices.iter_mut() {
                v.x *= sx;
                v.y *= sy;
            }
        }

        self.bounds = new_bounds;
    }

    /// Append a vertex (absolute coordinates) to an unfinished polygon,
    /// re-deriving the envelope.
    pub fn push_vertex(&mut self, vertex: Point) {
        let mut absolute = self.absolute_vertices();
        absolute.push(vertex);
        let origin = envelope(&absolute);
        let offset = origin.origin().to_vec2();
        self.bounds = origin;
        self.vertices = Some(absolute.into_iter().map(|v| v - offset).collect());
    }

    /// Mark the structure as finished.
    ///
    /// Polygons need at least three vertices.
    pub fn finalize(&mut self) -> EditResult<()> {
        if self.shape_kind == ShapeKind::Polygon && self.relative_vertices().len() < 3 {
            return Err(EditError::InvalidGeometry(format!(
                "polygon needs at least 3 vertices, got {}",
                self.relative_vertices().len()
            )));
        }
        self.finalized = true;
        Ok(())
    }

    /// Whether `point` lies inside the shape.
    pub fn contains(&self, point: Point) -> bool {
        match self.shape_kind {
            ShapeKind::Rectangle => self.bounds.contains(point),
            ShapeKind::Circle => (point - self.center()).hypot() <= self.radius(),
            ShapeKind::Polygon if self.has_polygon_outline() => {
                polygon_contains(&self.absolute_vertices(), point)
            }
            ShapeKind::Polygon => self.bounds.contains(point),
        }
    }

    /// Whether `point` hits the structure's area or lies within `tolerance`
    /// of its outline.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        if self.contains(point) {
            return true;
        }
        let nearest = projection::project(point, self);
        (nearest.point() - point).hypot() <= tolerance
    }
}

fn square(bounds: Bounds) -> Bounds {
    let side = bounds.width.max(bounds.height);
    Bounds::new(bounds.x, bounds.y, side, side)
}

fn scale_factor(old: f64, new: f64) -> f64 {
    if old > f64::EPSILON { new / old } else { 1.0 }
}

/// Min/max envelope of a vertex list.
fn envelope(vertices: &[Point]) -> Bounds {
    let Some(first) = vertices.first() else {
        return Bounds::default();
    };
    let (mut min, mut max) = (*first, *first);
    for v in &vertices[1..] {
        min.x = min.x.min(v.x);
        min.y = min.y.min(v.y);
        max.x = max.x.max(v.x);
        max.y = max.y.max(v.y);
    }
    Bounds::from_points(min, max)
}

/// Even-odd point-in-polygon test.
fn polygon_contains(vertices: &[Point], point: Point) -> bool {
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
