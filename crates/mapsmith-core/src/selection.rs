//! Drag gestures and resize handles for structures.

use crate::docking::{DockingGraph, StructureMap};
use crate::error::{EditError, EditResult};
use crate::shapes::{Bounds, Structure, StructureId};
use crate::snap::Grid;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 12.0;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Position of this corner on `bounds`.
    pub fn of(self, bounds: Bounds) -> Point {
        let rect = bounds.to_rect();
        match self {
            Corner::TopLeft => Point::new(rect.x0, rect.y0),
            Corner::TopRight => Point::new(rect.x1, rect.y0),
            Corner::BottomLeft => Point::new(rect.x0, rect.y1),
            Corner::BottomRight => Point::new(rect.x1, rect.y1),
        }
    }

    /// The diagonally opposite corner, which stays fixed during a resize.
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }
}

/// A resize handle with its position in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub position: Point,
    pub corner: Corner,
}

impl Handle {
    /// Check if a point (in world coordinates) hits this handle.
    /// `tolerance` should be adjusted for camera zoom.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point - self.position).hypot2() <= tolerance * tolerance
    }
}

/// Corner handles on a structure's bounds.
pub fn handles_for(structure: &Structure) -> Vec<Handle> {
    Corner::ALL
        .iter()
        .map(|&corner| Handle {
            position: corner.of(structure.bounds),
            corner,
        })
        .collect()
}

/// Find which handle (if any) is hit at the given point.
pub fn hit_test_handles(structure: &Structure, point: Point, tolerance: f64) -> Option<Corner> {
    handles_for(structure)
        .into_iter()
        .find(|handle| handle.hit_test(point, tolerance))
        .map(|handle| handle.corner)
}

/// Bounds produced by dragging `corner` of `start` to `target`, keeping the
/// opposite corner fixed. Dragging past the fixed corner flips the box.
pub fn resize_bounds(start: Bounds, corner: Corner, target: Point) -> Bounds {
    Bounds::from_points(corner.opposite().of(start), target)
}

/// A whole-structure move in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveDrag {
    /// Root of the docked group being moved.
    pub structure_id: StructureId,
    pub start_point: Point,
    pub start_bounds: Bounds,
    /// Structures carried along by docking, with their starting bounds.
    pub connected: Vec<(StructureId, Bounds)>,
    pub changed: bool,
}

/// A corner resize in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeDrag {
    pub structure_id: StructureId,
    pub handle: Corner,
    pub start_point: Point,
    pub start_bounds: Bounds,
    /// Full starting state; resizing rescales polygon vertices.
    pub original: Structure,
    pub connected: Vec<(StructureId, Bounds)>,
    pub changed: bool,
}

/// Drag gesture state machine.
///
/// `Idle → Dragging | Resizing → Idle`. Every exit (`end`, `cancel`) returns
/// to `Idle`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(MoveDrag),
    Resizing(ResizeDrag),
}

/// What a finished gesture touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureOutcome {
    pub structure_id: StructureId,
    /// Every structure whose bounds may differ from the start.
    pub affected: Vec<StructureId>,
    pub changed: bool,
}

impl DragState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DragState::Idle)
    }

    /// The structure driving the current gesture.
    pub fn structure_id(&self) -> Option<StructureId> {
        match self {
            DragState::Idle => None,
            DragState::Dragging(drag) => Some(drag.structure_id),
            DragState::Resizing(resize) => Some(resize.structure_id),
        }
    }

    /// Every structure the active gesture can move.
    pub fn affected(&self) -> Vec<StructureId> {
        match self {
            DragState::Idle => Vec::new(),
            DragState::Dragging(drag) => affected_ids(drag.structure_id, &drag.connected),
            DragState::Resizing(resize) => affected_ids(resize.structure_id, &resize.connected),
        }
    }

    /// Start moving `id`. A docked structure drags its whole group from the
    /// top of its chain.
    pub fn begin_move(
        &mut self,
        structures: &StructureMap,
        docking: &DockingGraph,
        id: StructureId,
        point: Point,
    ) -> EditResult<()> {
        if !structures.contains_key(&id) {
            return Err(EditError::StructureNotFound(id));
        }
        let root_id = docking.root_of(id);
        let root = structures
            .get(&root_id)
            .ok_or(EditError::StructureNotFound(root_id))?;
        if let Some(locked) = docking.locked_member(structures, root_id) {
            return Err(EditError::Locked(locked));
        }

        *self = DragState::Dragging(MoveDrag {
            structure_id: root_id,
            start_point: point,
            start_bounds: root.bounds,
            connected: snapshot_connected(structures, docking, root_id),
            changed: false,
        });
        Ok(())
    }

    /// Start resizing `id` from one of its corner handles.
    pub fn begin_resize(
        &mut self,
        structures: &StructureMap,
        docking: &DockingGraph,
        id: StructureId,
        handle: Corner,
        point: Point,
    ) -> EditResult<()> {
        let structure = structures.get(&id).ok_or(EditError::StructureNotFound(id))?;
        if let Some(locked) = docking.locked_member(structures, id) {
            return Err(EditError::Locked(locked));
        }
        *self = DragState::Resizing(ResizeDrag {
            structure_id: id,
            handle,
            start_point: point,
            start_bounds: structure.bounds,
            original: structure.clone(),
            connected: snapshot_connected(structures, docking, id),
            changed: false,
        });
        Ok(())
    }

    /// Apply the pointer position to the active gesture. Returns the ids
    /// that were updated.
    pub fn update(
        &mut self,
        structures: &mut StructureMap,
        docking: &DockingGraph,
        point: Point,
        grid: &Grid,
    ) -> Vec<StructureId> {
        match self {
            DragState::Idle => Vec::new(),
            DragState::Dragging(drag) => {
                let delta = point - drag.start_point;
                let target = grid.snap_point(drag.start_bounds.origin() + delta).point;
                let Some(root) = structures.get_mut(&drag.structure_id) else {
                    log::warn!("Dragged structure {} disappeared", drag.structure_id);
                    return Vec::new();
                };
                if root.origin() == target {
                    return Vec::new();
                }
                root.set_origin(target);
                drag.changed = true;

                let mut moved = vec![drag.structure_id];
                moved.extend(docking.propagate_move(structures, drag.structure_id));
                moved
            }
            DragState::Resizing(resize) => {
                let delta = point - resize.start_point;
                let corner = resize.handle.of(resize.start_bounds) + delta;
                let corner = grid.snap_point(corner).point;
                let new_bounds = resize_bounds(resize.start_bounds, resize.handle, corner);

                let mut next = resize.original.clone();
                next.resize(new_bounds, grid.min_size());
                // A docked structure keeps its slot next to the anchor.
                if let Some(origin) = docking.docked_origin(structures, resize.structure_id) {
                    next.set_origin(origin);
                }
                let Some(structure) = structures.get_mut(&resize.structure_id) else {
                    log::warn!("Resized structure {} disappeared", resize.structure_id);
                    return Vec::new();
                };
                if next.bounds == structure.bounds {
                    return Vec::new();
                }
                *structure = next;
                resize.changed = true;

                let mut moved = vec![resize.structure_id];
                moved.extend(docking.propagate_move(structures, resize.structure_id));
                moved
            }
        }
    }

    /// Commit the gesture and return to `Idle`.
    pub fn end(&mut self) -> Option<GestureOutcome> {
        match std::mem::take(self) {
            DragState::Idle => None,
            DragState::Dragging(drag) => Some(GestureOutcome {
                structure_id: drag.structure_id,
                affected: affected_ids(drag.structure_id, &drag.connected),
                changed: drag.changed,
            }),
            DragState::Resizing(resize) => Some(GestureOutcome {
                structure_id: resize.structure_id,
                affected: affected_ids(resize.structure_id, &resize.connected),
                changed: resize.changed,
            }),
        }
    }

    /// Abort the gesture, restoring every affected structure to where it
    /// started, and return to `Idle`.
    pub fn cancel(&mut self, structures: &mut StructureMap) -> Option<GestureOutcome> {
        let outcome = match std::mem::take(self) {
            DragState::Idle => return None,
            DragState::Dragging(drag) => {
                if let Some(root) = structures.get_mut(&drag.structure_id) {
                    root.bounds = drag.start_bounds;
                }
                restore_connected(structures, &drag.connected);
                GestureOutcome {
                    structure_id: drag.structure_id,
                    affected: affected_ids(drag.structure_id, &drag.connected),
                    changed: drag.changed,
                }
            }
            DragState::Resizing(resize) => {
                if let Some(structure) = structures.get_mut(&resize.structure_id) {
                    *structure = resize.original;
                }
                restore_connected(structures, &resize.connected);
                GestureOutcome {
                    structure_id: resize.structure_id,
                    affected: affected_ids(resize.structure_id, &resize.connected),
                    changed: resize.changed,
                }
            }
        };
        log::debug!("Cancelled gesture on structure {}", outcome.structure_id);
        Some(outcome)
    }
}

/// Bounds of everything docked (transitively) to `root`.
fn snapshot_connected(
    structures: &StructureMap,
    docking: &DockingGraph,
    root: StructureId,
) -> Vec<(StructureId, Bounds)> {
    docking
        .connected_set(root)
        .into_iter()
        .filter_map(|id| structures.get(&id).map(|s| (id, s.bounds)))
        .collect()
}

fn restore_connected(structures: &mut StructureMap, connected: &[(StructureId, Bounds)]) {
    for (id, bounds) in connected {
        if let Some(structure) = structures.get_mut(id) {
            structure.bounds = *bounds;
        }
    }
}

fn affected_ids(root: StructureId, connected: &[(StructureId, Bounds)]) -> Vec<StructureId> {
    std::iter::once(root)
        .chain(connected.iter().map(|(id, _)| *id))
        .collect()
}
