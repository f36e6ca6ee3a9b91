//! Docking relationships between structures.
//!
//! A docked structure is glued to an anchor at one of twelve slots around the
//! anchor's bounds. The relationship stores the docked structure's origin
//! relative to the anchor's origin. Dragging an anchor re-derives every
//! dependent position from that stored offset, anchor first, so chains like
//! A <- B <- C resolve in a single pass.
//!
//! Offsets are only written by [`DockingGraph::dock`]. Moves never touch them.

use crate::error::{EditError, EditResult};
use crate::shapes::{Bounds, Structure, StructureId};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Structures keyed by id.
pub type StructureMap = HashMap<StructureId, Structure>;

/// Side of the anchor a slot sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockSide {
    Top,
    Right,
    Bottom,
    Left,
}

/// The twelve slots a structure can be docked into, three per side.
///
/// For top/bottom slots the second word is the horizontal alignment; for
/// left/right slots it is the vertical alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DockPosition {
    TopLeft,
    TopCenter,
    TopRight,
    RightTop,
    RightMiddle,
    RightBottom,
    BottomLeft,
    BottomCenter,
    BottomRight,
    LeftTop,
    LeftMiddle,
    LeftBottom,
}

/// Alignment along the side of the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Start,
    Middle,
    End,
}

impl DockPosition {
    pub const ALL: [DockPosition; 12] = [
        DockPosition::TopLeft,
        DockPosition::TopCenter,
        DockPosition::TopRight,
        DockPosition::RightTop,
        DockPosition::RightMiddle,
        DockPosition::RightBottom,
        DockPosition::BottomLeft,
        DockPosition::BottomCenter,
        DockPosition::BottomRight,
        DockPosition::LeftTop,
        DockPosition::LeftMiddle,
        DockPosition::LeftBottom,
    ];

    pub fn side(self) -> DockSide {
        self.parts().0
    }

    fn parts(self) -> (DockSide, Align) {
        use DockPosition::*;
        match self {
            TopLeft => (DockSide::Top, Align::Start),
            TopCenter => (DockSide::Top, Align::Middle),
            TopRight => (DockSide::Top, Align::End),
            RightTop => (DockSide::Right, Align::Start),
            RightMiddle => (DockSide::Right, Align::Middle),
            RightBottom => (DockSide::Right, Align::End),
            BottomLeft => (DockSide::Bottom, Align::Start),
            BottomCenter => (DockSide::Bottom, Align::Middle),
            BottomRight => (DockSide::Bottom, Align::End),
            LeftTop => (DockSide::Left, Align::Start),
            LeftMiddle => (DockSide::Left, Align::Middle),
            LeftBottom => (DockSide::Left, Align::End),
        }
    }

    /// Kebab-case name, matching the serialized form.
    pub fn name(self) -> &'static str {
        use DockPosition::*;
        match self {
            TopLeft => "top-left",
            TopCenter => "top-center",
            TopRight => "top-right",
            RightTop => "right-top",
            RightMiddle => "right-middle",
            RightBottom => "right-bottom",
            BottomLeft => "bottom-left",
            BottomCenter => "bottom-center",
            BottomRight => "bottom-right",
            LeftTop => "left-top",
            LeftMiddle => "left-middle",
            LeftBottom => "left-bottom",
        }
    }

    /// Parse a kebab-case slot name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Where the target's origin must go to sit in `position` next to `anchor`.
pub fn desired_target_origin(anchor: Bounds, target: Bounds, position: DockPosition) -> Point {
    let (side, align) = position.parts();
    let along = |start: f64, anchor_len: f64, target_len: f64| match align {
        Align::Start => start,
        Align::Middle => start + (anchor_len - target_len) / 2.0,
        Align::End => start + anchor_len - target_len,
    };
    match side {
        DockSide::Top => Point::new(
            along(anchor.x, anchor.width, target.width),
            anchor.y - target.height,
        ),
        DockSide::Bottom => Point::new(
            along(anchor.x, anchor.width, target.width),
            anchor.y + anchor.height,
        ),
        DockSide::Right => Point::new(
            anchor.x + anchor.width,
            along(anchor.y, anchor.height, target.height),
        ),
        DockSide::Left => Point::new(
            anchor.x - target.width,
            along(anchor.y, anchor.height, target.height),
        ),
    }
}

/// One "docked to" edge of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DockingRelationship {
    pub docked_id: StructureId,
    pub anchor_id: StructureId,
    pub position: DockPosition,
    /// Docked origin minus anchor origin, fixed at dock time.
    pub offset: Vec2,
}

/// Index of docking relationships keyed by the docked structure's id.
///
/// Each key holds a list to leave room for multiple anchors; the first
/// entry is the authoritative one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DockingGraph {
    relationships: HashMap<StructureId, Vec<DockingRelationship>>,
}

impl DockingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    /// Number of docked structures.
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// All relationships, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &DockingRelationship> {
        self.relationships.values().flatten()
    }

    /// The authoritative relationship for a docked structure.
    pub fn relationship(&self, docked_id: StructureId) -> Option<&DockingRelationship> {
        self.relationships.get(&docked_id).and_then(|list| list.first())
    }

    pub fn anchor_of(&self, docked_id: StructureId) -> Option<StructureId> {
        self.relationship(docked_id).map(|r| r.anchor_id)
    }

    /// Whether the structure takes part in any relationship, as either side.
    pub fn is_docked(&self, id: StructureId) -> bool {
        self.relationships.contains_key(&id) || self.iter().any(|r| r.anchor_id == id)
    }

    /// Structures directly docked to `anchor_id`, sorted by id.
    pub fn dependents_of(&self, anchor_id: StructureId) -> Vec<StructureId> {
        let mut dependents: Vec<StructureId> = self
            .relationships
            .iter()
            .filter(|(_, list)| list.first().is_some_and(|r| r.anchor_id == anchor_id))
            .map(|(&id, _)| id)
            .collect();
        dependents.sort_unstable();
        dependents
    }

    /// Every structure transitively docked to `root`, anchors before their
    /// dependents. `root` itself is not included.
    pub fn connected_set(&self, root: StructureId) -> Vec<StructureId> {
        let mut visited = HashSet::from([root]);
        let mut order = Vec::new();
        let mut stack: Vec<StructureId> = self.dependents_of(root).into_iter().rev().collect();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.dependents_of(id).into_iter().rev());
        }
        order
    }

    /// Follow anchors upward to the top of the chain containing `id`.
    pub fn root_of(&self, id: StructureId) -> StructureId {
        let mut current = id;
        let mut seen = HashSet::from([id]);
        while let Some(anchor) = self.anchor_of(current) {
            if !seen.insert(anchor) {
                break;
            }
            current = anchor;
        }
        current
    }

    /// Dock `target_id` to `anchor_id` at `position`.
    ///
    /// The target moves into place immediately and any structures docked to
    /// it follow. A target already docked elsewhere is re-docked. Returns the
    /// translation applied to the target.
    pub fn dock(
        &mut self,
        structures: &mut StructureMap,
        anchor_id: StructureId,
        target_id: StructureId,
        position: DockPosition,
    ) -> EditResult<Vec2> {
        let invalid = |reason| EditError::InvalidDock {
            anchor: anchor_id,
            target: target_id,
            reason,
        };
        if anchor_id == target_id {
            return Err(invalid("a structure cannot dock to itself"));
        }
        if self.connected_set(target_id).contains(&anchor_id) {
            return Err(invalid("the anchor is already docked to the target"));
        }
        let anchor = structures
            .get(&anchor_id)
            .ok_or(EditError::StructureNotFound(anchor_id))?
            .bounds;
        let target = structures
            .get_mut(&target_id)
            .ok_or(EditError::StructureNotFound(target_id))?;

        let desired = desired_target_origin(anchor, target.bounds, position);
        let translation = desired - target.origin();
        target.set_origin(desired);

        self.relationships.insert(
            target_id,
            vec![DockingRelationship {
                docked_id: target_id,
                anchor_id,
                position,
                offset: desired - anchor.origin(),
            }],
        );
        self.propagate_move(structures, target_id);

        log::debug!(
            "Docked structure {} to {} at {}",
            target_id,
            anchor_id,
            position.name()
        );
        Ok(translation)
    }

    /// Remove every relationship keyed by `target_id` and every relationship
    /// whose anchor is `target_id`. Returns the removed relationships.
    pub fn undock(&mut self, target_id: StructureId) -> Vec<DockingRelationship> {
        let mut removed = self.relationships.remove(&target_id).unwrap_or_default();

        let keys: Vec<StructureId> = self.relationships.keys().copied().collect();
        for key in keys {
            let Some(list) = self.relationships.get_mut(&key) else {
                continue;
            };
            let (gone, kept): (Vec<_>, Vec<_>) =
                list.drain(..).partition(|r| r.anchor_id == target_id);
            removed.extend(gone);
            if kept.is_empty() {
                self.relationships.remove(&key);
            } else {
                *list = kept;
            }
        }

        if !removed.is_empty() {
            log::debug!(
                "Undocked structure {} ({} relationships removed)",
                target_id,
                removed.len()
            );
        }
        removed
    }

    /// Drop all relationships involving a deleted structure.
    pub fn remove_structure(&mut self, id: StructureId) -> Vec<DockingRelationship> {
        self.undock(id)
    }

    /// Drop relationships that reference structures missing from `structures`.
    ///
    /// Used after loading, where persisted relationships may be stale.
    pub fn prune(&mut self, structures: &StructureMap) -> usize {
        let stale: Vec<StructureId> = self
            .iter()
            .flat_map(|r| [r.docked_id, r.anchor_id])
            .filter(|id| !structures.contains_key(id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let mut removed = 0;
        for id in stale {
            log::warn!("Dropping docking relationships for missing structure {}", id);
            removed += self.undock(id).len();
        }
        removed
    }

    /// Where a docked structure belongs: its anchor's origin plus the stored
    /// offset. `None` when `id` is not docked or its anchor is missing.
    pub fn docked_origin(&self, structures: &StructureMap, id: StructureId) -> Option<Point> {
        let rel = self.relationship(id)?;
        structures.get(&rel.anchor_id).map(|anchor| anchor.origin() + rel.offset)
    }

    /// The first locked structure among `root` and everything docked to it.
    pub fn locked_member(&self, structures: &StructureMap, root: StructureId) -> Option<StructureId> {
        std::iter::once(root)
            .chain(self.connected_set(root))
            .find(|id| structures.get(id).is_some_and(|s| s.locked))
    }

    /// Re-derive positions of everything docked (transitively) to `root`
    /// from the current anchor bounds. Returns the ids that were moved.
    pub fn propagate_move(&self, structures: &mut StructureMap, root: StructureId) -> Vec<StructureId> {
        let connected = self.connected_set(root);
        let mut moved = Vec::with_capacity(connected.len());
        for id in connected {
            let Some(origin) = self.docked_origin(structures, id) else {
                log::warn!("Anchor of structure {} is missing", id);
                continue;
            };
            if let Some(structure) = structures.get_mut(&id) {
                structure.set_origin(origin);
                moved.push(id);
            }
        }
        moved
    }

    /// Translate `root` by `delta` and carry its docked group along.
    pub fn move_group(
        &self,
        structures: &mut StructureMap,
        root: StructureId,
        delta: Vec2,
    ) -> EditResult<Vec<StructureId>> {
        structures
            .get_mut(&root)
            .ok_or(EditError::StructureNotFound(root))?
            .translate(delta);
        let mut moved = vec![root];
        moved.extend(self.propagate_move(structures, root));
        Ok(moved)
    }
}
