//! Tool system for the map editor.

use crate::markers::MarkerKind;
use crate::shapes::{Bounds, ShapeKind, StructureKind};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Select,
    Pan,
    Rectangle,
    Circle,
    Polygon,
    Door,
    Teleport,
    Prop,
    Encounter,
    Light,
    Note,
}

impl ToolKind {
    pub const ALL: [ToolKind; 11] = [
        ToolKind::Select,
        ToolKind::Pan,
        ToolKind::Rectangle,
        ToolKind::Circle,
        ToolKind::Polygon,
        ToolKind::Door,
        ToolKind::Teleport,
        ToolKind::Prop,
        ToolKind::Encounter,
        ToolKind::Light,
        ToolKind::Note,
    ];

    /// Shape drawn by this tool, for structure tools.
    pub fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            ToolKind::Rectangle => Some(ShapeKind::Rectangle),
            ToolKind::Circle => Some(ShapeKind::Circle),
            ToolKind::Polygon => Some(ShapeKind::Polygon),
            _ => None,
        }
    }

    /// Marker placed by this tool, for marker tools.
    pub fn marker_kind(self) -> Option<MarkerKind> {
        match self {
            ToolKind::Door => Some(MarkerKind::Door),
            ToolKind::Teleport => Some(MarkerKind::Teleport),
            ToolKind::Prop => Some(MarkerKind::Prop),
            ToolKind::Encounter => Some(MarkerKind::Encounter),
            ToolKind::Light => Some(MarkerKind::Light),
            ToolKind::Note => Some(MarkerKind::Note),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::Pan => "pan",
            ToolKind::Rectangle => "rectangle",
            ToolKind::Circle => "circle",
            ToolKind::Polygon => "polygon",
            ToolKind::Door => "door",
            ToolKind::Teleport => "teleport",
            ToolKind::Prop => "prop",
            ToolKind::Encounter => "encounter",
            ToolKind::Light => "light",
            ToolKind::Note => "note",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// State of a tool interaction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ToolState {
    /// Tool is idle, waiting for interaction.
    #[default]
    Idle,
    /// A drag-create rubber band is being drawn.
    Active {
        /// Starting point of the interaction.
        start: Point,
        /// Current point of the interaction.
        current: Point,
    },
}

/// Manages the current tool and its state.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Current state of the tool.
    pub state: ToolState,
    /// Kind assigned to new structures.
    pub structure_kind: StructureKind,
    /// Vertices clicked so far with the polygon tool (world coordinates).
    polygon_points: Vec<Point>,
}

impl ToolManager {
    /// Create a new tool manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current tool, dropping any in-progress interaction.
    ///
    /// Returns `true` when leaving the teleport tool, in which case a pending
    /// half-placed teleport pair has to be cancelled by the caller.
    pub fn set_tool(&mut self, tool: ToolKind) -> bool {
        let leaving_teleport = self.current_tool == ToolKind::Teleport && tool != ToolKind::Teleport;
        self.current_tool = tool;
        self.cancel();
        leaving_teleport
    }

    /// Begin a drag-create interaction.
    pub fn begin(&mut self, point: Point) {
        self.state = ToolState::Active {
            start: point,
            current: point,
        };
    }

    /// Update the current interaction.
    pub fn update(&mut self, point: Point) {
        if let ToolState::Active { current, .. } = &mut self.state {
            *current = point;
        }
    }

    /// End the current interaction and return the dragged-out box.
    pub fn end(&mut self, point: Point) -> Option<Bounds> {
        let ToolState::Active { start, .. } = self.state else {
            return None;
        };
        self.state = ToolState::Idle;
        Some(Bounds::from_points(start, point))
    }

    /// Cancel the current interaction, clearing buffers and previews.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
        self.polygon_points.clear();
    }

    /// Check if a drag-create interaction is active.
    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }

    /// Rubber band preview for the current interaction.
    pub fn preview_bounds(&self) -> Option<Bounds> {
        match self.state {
            ToolState::Active { start, current } => Some(Bounds::from_points(start, current)),
            ToolState::Idle => None,
        }
    }

    /// Append a vertex to the polygon being drawn.
    ///
    /// Clicking the previous vertex again is ignored.
    pub fn push_polygon_point(&mut self, point: Point) -> bool {
        if self.polygon_points.last() == Some(&point) {
            return false;
        }
        self.polygon_points.push(point);
        true
    }

    pub fn polygon_points(&self) -> &[Point] {
        &self.polygon_points
    }

    /// Take the polygon buffer, leaving it empty.
    pub fn take_polygon_points(&mut self) -> Vec<Point> {
        std::mem::take(&mut self.polygon_points)
    }
}
