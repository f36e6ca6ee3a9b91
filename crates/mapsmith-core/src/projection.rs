//! Nearest-point projection onto structure outlines.
//!
//! Doors are snapped onto walls by projecting the cursor onto every candidate
//! wall and keeping the closest hit. The projection also yields a rotation so
//! the door faces away from the wall it sits on.
//!
//! Rotation conventions (degrees):
//! - rectangles use a fixed angle per edge: top 0, right -90, bottom 180, left 90;
//! - circles use the polar angle of the hit point plus 90, wrapped to `[0, 360)`;
//! - polygons use the outward normal of the winning edge, mapped onto the
//!   rectangle convention so a rectangular polygon matches a rectangle.

use crate::shapes::{Bounds, ShapeKind, Structure, StructureId};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Default search radius for door placement, in map pixels.
pub const DOOR_SNAP_DISTANCE: f64 = 100.0;

/// Which part of a structure's outline a projection landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeLabel {
    Top,
    Right,
    Bottom,
    Left,
    /// Circle outline.
    Arc,
    /// Polygon edge starting at the given vertex index.
    Segment(usize),
}

/// Closest point on a structure outline plus a door-facing rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub x: f64,
    pub y: f64,
    pub edge: EdgeLabel,
    pub rotation_degrees: f64,
}

impl ProjectionResult {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Distance from `query` to the projected point.
    pub fn distance_to(&self, query: Point) -> f64 {
        (self.point() - query).hypot()
    }
}

/// A projection onto a specific wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    pub wall_id: StructureId,
    pub projection: ProjectionResult,
    pub distance: f64,
}

/// Project `query` onto the outline of `structure`.
///
/// Polygons with fewer than three vertices are projected against their
/// bounds. Zero-size structures return their single point.
pub fn project(query: Point, structure: &Structure) -> ProjectionResult {
    match structure.shape_kind {
        ShapeKind::Rectangle => project_rectangle(query, structure.bounds),
        ShapeKind::Circle => project_circle(query, structure.center(), structure.radius()),
        ShapeKind::Polygon if structure.has_polygon_outline() => {
            project_polygon(query, &structure.absolute_vertices())
        }
        ShapeKind::Polygon => project_rectangle(query, structure.bounds),
    }
}

/// Find the closest wall to `query` within `max_distance`.
///
/// Non-wall structures are skipped. Ties keep the first wall in iteration order.
pub fn nearest_wall<'a>(
    query: Point,
    structures: impl IntoIterator<Item = &'a Structure>,
    max_distance: f64,
) -> Option<WallHit> {
    let mut best: Option<WallHit> = None;
    for structure in structures.into_iter().filter(|s| s.is_wall()) {
        let projection = project(query, structure);
        let distance = projection.distance_to(query);
        if distance > max_distance {
            continue;
        }
        if best.is_none_or(|b| distance < b.distance) {
            best = Some(WallHit {
                wall_id: structure.id,
                projection,
                distance,
            });
        }
    }
    best
}

/// Closest point to `p` on segment `a`-`b` and its parameter `t` in `[0, 1]`.
pub fn project_point_to_segment(p: Point, a: Point, b: Point) -> (Point, f64) {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq < f64::EPSILON {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

fn project_rectangle(query: Point, bounds: Bounds) -> ProjectionResult {
    let rect = bounds.to_rect();
    let cx = query.x.clamp(rect.x0, rect.x1);
    let cy = query.y.clamp(rect.y0, rect.y1);

    let candidates = [
        (EdgeLabel::Top, Point::new(cx, rect.y0), 0.0),
        (EdgeLabel::Right, Point::new(rect.x1, cy), -90.0),
        (EdgeLabel::Bottom, Point::new(cx, rect.y1), 180.0),
        (EdgeLabel::Left, Point::new(rect.x0, cy), 90.0),
    ];

    let mut best = candidates[0];
    let mut best_dist = (best.1 - query).hypot2();
    for candidate in &candidates[1..] {
        let dist = (candidate.1 - query).hypot2();
        if dist < best_dist {
            best = *candidate;
            best_dist = dist;
        }
    }

    let (edge, point, rotation_degrees) = best;
    ProjectionResult {
        x: point.x,
        y: point.y,
        edge,
        rotation_degrees,
    }
}

fn project_circle(query: Point, center: Point, radius: f64) -> ProjectionResult {
    let d = query - center;
    let theta = d.y.atan2(d.x);
    let point = center + Vec2::new(theta.cos(), theta.sin()) * radius;
    ProjectionResult {
        x: point.x,
        y: point.y,
        edge: EdgeLabel::Arc,
        rotation_degrees: wrap_full_turn(theta.to_degrees() + 90.0),
    }
}

fn project_polygon(query: Point, vertices: &[Point]) -> ProjectionResult {
    let clockwise_in_screen = signed_area(vertices) >= 0.0;

    let mut best_point = vertices[0];
    let mut best_dist = f64::INFINITY;
    let mut best_edge = 0;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[(i + 1) % vertices.len()]);
        let (point, _) = project_point_to_segment(query, a, b);
        let dist = (point - query).hypot2();
        if dist < best_dist {
            best_point = point;
            best_dist = dist;
            best_edge = i;
        }
    }

    let a = vertices[best_edge];
    let b = vertices[(best_edge + 1) % vertices.len()];
    let dir = b - a;
    let normal = if clockwise_in_screen {
        Vec2::new(dir.y, -dir.x)
    } else {
        Vec2::new(-dir.y, dir.x)
    };
    let normal_degrees = normal.y.atan2(normal.x).to_degrees();

    ProjectionResult {
        x: best_point.x,
        y: best_point.y,
        edge: EdgeLabel::Segment(best_edge),
        rotation_degrees: wrap_half_turn(-(normal_degrees + 90.0)),
    }
}

/// Shoelace area. Positive for vertices that run clockwise on a y-down screen.
fn signed_area(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let (a, b) = (vertices[i], vertices[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

/// Tolerance for float noise when wrapping angles.
const ANGLE_EPS: f64 = 1e-9;

/// Wrap an angle into `[0, 360)`.
fn wrap_full_turn(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 360.0 - ANGLE_EPS { 0.0 } else { wrapped }
}

/// Wrap an angle into `(-180, 180]`.
fn wrap_half_turn(degrees: f64) -> f64 {
    let wrapped = wrap_full_turn(degrees);
    if wrapped > 180.0 + ANGLE_EPS { wrapped - 360.0 } else { wrapped }
}
