//! Functional markers placed on the map (doors, teleports, props, ...).

mod pairing;

pub use pairing::{Connector, PairingEvent, PairingState, TeleportPairing};

use crate::projection::{EdgeLabel, ProjectionResult};
use crate::shapes::StructureId;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for markers.
pub type MarkerId = u64;

/// Markers keyed by id.
pub type MarkerMap = HashMap<MarkerId, Marker>;

/// Kind of marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Door,
    Teleport,
    Prop,
    Encounter,
    Light,
    Note,
}

impl MarkerKind {
    /// Whether this marker must sit on a wall.
    pub fn attaches_to_wall(self) -> bool {
        self == MarkerKind::Door
    }

    pub fn name(self) -> &'static str {
        match self {
            MarkerKind::Door => "Door",
            MarkerKind::Teleport => "Teleport",
            MarkerKind::Prop => "Prop",
            MarkerKind::Encounter => "Encounter",
            MarkerKind::Light => "Light",
            MarkerKind::Note => "Note",
        }
    }
}

/// Type-specific marker fields.
///
/// Known fields are typed; anything else a dialog stores is kept in `extra`
/// and round-trips untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerData {
    /// Teleport: shared by both halves of a pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_id: Option<u64>,
    /// Teleport: true for the first-placed half.
    #[serde(default)]
    pub is_point_a: bool,
    /// Teleport: true once both halves exist.
    #[serde(default)]
    pub has_pair: bool,
    /// Teleport: runtime back reference to the other half, rebuilt on load.
    #[serde(skip)]
    pub paired_marker: Option<MarkerId>,

    /// Door: the wall the door was projected onto.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_id: Option<StructureId>,
    /// Door: the wall edge it sits on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeLabel>,
    /// Door: facing angle in degrees.
    #[serde(default)]
    pub rotation: f64,

    /// Prop: footprint size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,

    /// Encounter/note text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A marker on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    #[serde(rename = "type")]
    pub kind: MarkerKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub data: MarkerData,
}

impl Marker {
    pub fn new(id: MarkerId, kind: MarkerKind, position: Point) -> Self {
        Self {
            id,
            kind,
            x: position.x,
            y: position.y,
            data: MarkerData::default(),
        }
    }

    /// Create a door sitting on a wall at a projected point.
    pub fn door(id: MarkerId, wall_id: StructureId, projection: &ProjectionResult) -> Self {
        let mut marker = Self::new(id, MarkerKind::Door, projection.point());
        marker.data.wall_id = Some(wall_id);
        marker.data.edge = Some(projection.edge);
        marker.data.rotation = projection.rotation_degrees;
        marker
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_position(&mut self, position: Point) {
        self.x = position.x;
        self.y = position.y;
    }

    pub fn is_teleport(&self) -> bool {
        self.kind == MarkerKind::Teleport
    }

    /// The other half of a teleport pair, if linked.
    pub fn paired_marker(&self) -> Option<MarkerId> {
        self.data.paired_marker
    }

    /// Break this marker's half of a teleport link.
    pub(crate) fn clear_pair(&mut self) {
        self.data.paired_marker = None;
        self.data.has_pair = false;
        self.data.pair_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teleport_json_layout() {
        let mut marker = Marker::new(7, MarkerKind::Teleport, Point::new(10.0, 20.0));
        marker.data.pair_id = Some(3);
        marker.data.is_point_a = true;
        marker.data.has_pair = true;
        marker.data.paired_marker = Some(8);

        let json = serde_json::to_value(&marker).unwrap();
        assert_eq!(json["type"], "teleport");
        assert_eq!(json["data"]["pair_id"], 3);
        assert_eq!(json["data"]["is_point_a"], true);
        assert_eq!(json["data"]["has_pair"], true);
        assert!(json["data"].get("paired_marker").is_none());

        let restored: Marker = serde_json::from_value(json).unwrap();
        assert_eq!(restored.data.paired_marker, None);
        assert_eq!(restored.data.pair_id, Some(3));
    }

    #[test]
    fn test_extra_fields_roundtrip() {
        let json = r#"{"id":1,"type":"encounter","x":0,"y":0,"data":{"text":"Goblins","monsters":["goblin","goblin"]}}"#;
        let marker: Marker = serde_json::from_str(json).unwrap();
        assert_eq!(marker.data.text.as_deref(), Some("Goblins"));
        assert!(marker.data.extra.contains_key("monsters"));
        let back = serde_json::to_value(&marker).unwrap();
        assert_eq!(back["data"]["monsters"][1], "goblin");
    }

    #[test]
    fn test_door_from_projection() {
        let projection = ProjectionResult {
            x: 100.0,
            y: 10.0,
            edge: EdgeLabel::Right,
            rotation_degrees: -90.0,
        };
        let door = Marker::door(4, 2, &projection);
        assert_eq!(door.position(), Point::new(100.0, 10.0));
        assert_eq!(door.data.wall_id, Some(2));
        assert_eq!(door.data.edge, Some(EdgeLabel::Right));
        assert_eq!(door.data.rotation, -90.0);
    }
}
