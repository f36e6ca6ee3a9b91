//! Editor session: a map document plus the runtime state needed to edit it.

mod config;
mod pointer;

pub use config::EditorConfig;

use crate::camera::Camera;
use crate::collaborators::{Collaborators, ElementRef, Notice};
use crate::docking::DockPosition;
use crate::document::MapDocument;
use crate::error::{EditError, EditResult};
use crate::input::InputState;
use crate::markers::{Connector, Marker, MarkerData, MarkerId, MarkerKind, PairingEvent, TeleportPairing};
use crate::projection::{self, nearest_wall};
use crate::selection::DragState;
use crate::shapes::{Bounds, ShapeKind, Structure, StructureId, StructureKind};
use crate::snap::{Grid, SnapMode};
use crate::tools::{ToolKind, ToolManager};
use kurbo::{Point, Vec2};
use std::collections::HashSet;

/// What the user has picked with the select tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Structure(StructureId),
    Marker(MarkerId),
}

/// A marker being dragged with the select tool.
#[derive(Debug, Clone)]
struct MarkerDrag {
    original: Marker,
    start_point: Point,
    changed: bool,
}

/// One editing session over one map.
///
/// All mutation goes through these methods. Each rejected edit leaves the
/// state untouched, is returned as an [`EditError`] and is also handed to
/// the notifier.
pub struct Editor {
    document: MapDocument,
    config: EditorConfig,
    camera: Camera,
    tools: ToolManager,
    input: InputState,
    pairing: TeleportPairing,
    drag: DragState,
    marker_drag: Option<MarkerDrag>,
    selection: Option<Selection>,
    panning: bool,
    collaborators: Collaborators,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("document", &self.document.id)
            .field("tool", &self.tools.current_tool)
            .field("drag", &self.drag)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// Start a session on a new, empty map.
    pub fn new(config: EditorConfig) -> Self {
        let config = config.sanitized();
        let mut document = MapDocument::new();
        document.grid_size = config.grid_size;
        document.snap_mode = config.snap_mode;
        Self::with_parts(document, config)
    }

    /// Start a session on a loaded map, rebuilding runtime state: teleport
    /// links, connectors and a docking graph free of dangling ids.
    pub fn from_document(mut document: MapDocument, config: EditorConfig) -> Self {
        let repairs = document.repair();
        if repairs > 0 {
            log::warn!("Repaired {} inconsistencies in map {}", repairs, document.id);
        }
        for marker in document.markers.values_mut() {
            let Some(wall_id) = marker.data.wall_id else {
                continue;
            };
            if !document.structures.contains_key(&wall_id) {
                let err = EditError::Dangling(format!("door {} references wall {}", marker.id, wall_id));
                log::warn!("{}", err);
                marker.data.wall_id = None;
            }
        }

        let mut editor = Self::with_parts(document, config.sanitized());
        let pairs = editor.pairing.reconstruct(&mut editor.document.markers);
        log::info!(
            "Loaded map '{}': {} structures, {} markers, {} teleport pairs, {} docked",
            editor.document.name,
            editor.document.structures.len(),
            editor.document.markers.len(),
            pairs,
            editor.document.docking.len()
        );
        editor
    }

    fn with_parts(document: MapDocument, config: EditorConfig) -> Self {
        Self {
            camera: Camera::with_limits(config.min_zoom, config.max_zoom),
            document,
            config,
            tools: ToolManager::new(),
            input: InputState::new(),
            pairing: TeleportPairing::new(),
            drag: DragState::Idle,
            marker_drag: None,
            selection: None,
            panning: false,
            collaborators: Collaborators::default(),
        }
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn document(&self) -> &MapDocument {
        &self.document
    }

    pub fn into_document(self) -> MapDocument {
        self.document
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    pub fn current_tool(&self) -> ToolKind {
        self.tools.current_tool
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn pairing(&self) -> &TeleportPairing {
        &self.pairing
    }

    /// Lines between linked teleport pairs.
    pub fn connectors(&self) -> &[Connector] {
        self.pairing.connectors()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn select(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    /// Kind given to structures created from now on.
    pub fn set_structure_kind(&mut self, kind: StructureKind) {
        self.tools.structure_kind = kind;
    }

    /// Grid settings for the current map.
    pub fn grid(&self) -> Grid {
        Grid {
            cell_size: self.document.grid_size,
            mode: self.document.snap_mode,
            threshold: self.config.soft_snap_threshold,
        }
    }

    pub fn set_snap_mode(&mut self, mode: SnapMode) {
        self.document.snap_mode = mode;
        log::debug!("Snap mode: {}", mode.name());
    }

    pub fn cycle_snap_mode(&mut self) -> SnapMode {
        let mode = self.document.snap_mode.next();
        self.set_snap_mode(mode);
        mode
    }

    /// Run an edit, forwarding any rejection to the notifier.
    fn reporting<T>(&mut self, op: impl FnOnce(&mut Self) -> EditResult<T>) -> EditResult<T> {
        let result = op(self);
        if let Err(err) = &result {
            log::debug!("Edit rejected: {}", err);
            self.collaborators.notifier.notify(Notice::from(err));
        }
        result
    }

    // Structures

    /// Create a structure of the given shape filling `bounds`.
    ///
    /// Bounds are snapped to the grid and floored to one cell. A polygon
    /// placed this way starts as the four corners of the bounds.
    pub fn place_structure(&mut self, shape: ShapeKind, bounds: Bounds) -> EditResult<StructureId> {
        self.reporting(|editor| {
            ensure_finite_bounds(bounds)?;
            let grid = editor.grid();
            let bounds = grid.snap_bounds(bounds).clamped_size(grid.min_size());
            let id = editor.document.allocate_structure_id();
            let structure = match shape {
                ShapeKind::Rectangle => Structure::rectangle(id, bounds),
                ShapeKind::Circle => Structure::circle(id, bounds),
                ShapeKind::Polygon => {
                    let r = bounds.to_rect();
                    Structure::polygon(
                        id,
                        &[
                            Point::new(r.x0, r.y0),
                            Point::new(r.x1, r.y0),
                            Point::new(r.x1, r.y1),
                            Point::new(r.x0, r.y1),
                        ],
                    )
                }
            };
            editor.insert_structure(structure.with_kind(editor.tools.structure_kind));
            Ok(id)
        })
    }

    fn insert_structure(&mut self, structure: Structure) {
        let id = structure.id;
        log::debug!("Placed {} {}", structure.kind.name(), id);
        self.document.push_undo();
        self.document.add_structure(structure);
        self.collaborators
            .renderer
            .update_element(ElementRef::Structure(id));
        self.collaborators.layers.update_layers_list();
    }

    /// Add a vertex to the polygon being drawn. Returns the vertex count.
    pub fn add_polygon_point(&mut self, point: Point) -> EditResult<usize> {
        self.reporting(|editor| {
            ensure_finite(point)?;
            let snapped = editor.grid().snap_point(point).point;
            editor.tools.push_polygon_point(snapped);
            Ok(editor.tools.polygon_points().len())
        })
    }

    /// Turn the clicked vertices into a polygon structure.
    ///
    /// With fewer than three vertices nothing is created and the vertices are
    /// kept so drawing can continue.
    pub fn finish_polygon(&mut self) -> EditResult<StructureId> {
        self.reporting(|editor| {
            let count = editor.tools.polygon_points().len();
            if count < 3 {
                return Err(EditError::InvalidGeometry(format!(
                    "polygon needs at least 3 vertices, got {}",
                    count
                )));
            }
            let points = editor.tools.take_polygon_points();
            let id = editor.document.allocate_structure_id();
            let mut structure = Structure::polygon(id, &points).with_kind(editor.tools.structure_kind);
            structure.finalize()?;
            editor.insert_structure(structure);
            Ok(id)
        })
    }

    /// Delete a structure and everything hanging off it: docking
    /// relationships, folder entries and doors placed on it.
    pub fn delete_structure(&mut self, id: StructureId) -> EditResult<()> {
        self.reporting(|editor| {
            let structure = editor
                .document
                .structure(id)
                .ok_or(EditError::StructureNotFound(id))?;
            if structure.locked {
                return Err(EditError::Locked(id));
            }
            if editor.drag.affected().contains(&id) {
                editor.cancel_drag();
            }
            if editor
                .marker_drag
                .as_ref()
                .is_some_and(|drag| drag.original.data.wall_id == Some(id))
            {
                editor.cancel_marker_drag();
            }

            editor.document.push_undo();
            let doors = editor.document.doors_on(id);
            for door in &doors {
                editor.remove_marker(*door);
            }
            let undocked: Vec<StructureId> = editor
                .document
                .docking
                .iter()
                .filter(|r| r.anchor_id == id)
                .map(|r| r.docked_id)
                .collect();
            editor.document.remove_structure(id);

            log::debug!(
                "Deleted structure {} ({} doors, {} dependents undocked)",
                id,
                doors.len(),
                undocked.len()
            );
            if editor.selection == Some(Selection::Structure(id)) {
                editor.selection = None;
            }
            let renderer = &mut editor.collaborators.renderer;
            renderer.remove_element(ElementRef::Structure(id));
            for dependent in undocked {
                renderer.update_element(ElementRef::Structure(dependent));
            }
            editor.collaborators.layers.update_layers_list();
            Ok(())
        })
    }

    pub fn set_locked(&mut self, id: StructureId, locked: bool) -> EditResult<()> {
        self.reporting(|editor| {
            let current = editor
                .document
                .structure(id)
                .ok_or(EditError::StructureNotFound(id))?
                .locked;
            if current == locked {
                return Ok(());
            }
            editor.document.push_undo();
            if let Some(structure) = editor.document.structure_mut(id) {
                structure.locked = locked;
            }
            editor
                .collaborators
                .renderer
                .update_element(ElementRef::Structure(id));
            editor.collaborators.layers.update_layers_list();
            Ok(())
        })
    }

    /// Rename a structure as shown in the layers panel. Empty names clear it.
    pub fn rename_structure(&mut self, id: StructureId, name: &str) -> EditResult<()> {
        self.reporting(|editor| {
            let name = Some(name.trim()).filter(|name| !name.is_empty()).map(str::to_owned);
            let structure = editor
                .document
                .structure(id)
                .ok_or(EditError::StructureNotFound(id))?;
            if structure.name == name {
                return Ok(());
            }
            editor.document.push_undo();
            if let Some(structure) = editor.document.structure_mut(id) {
                structure.name = name;
            }
            editor.collaborators.layers.update_layers_list();
            Ok(())
        })
    }

    /// Move a structure so its origin lands on `origin` (snapped).
    ///
    /// A docked structure moves its whole group. Returns the ids that moved.
    pub fn move_structure(&mut self, id: StructureId, origin: Point) -> EditResult<Vec<StructureId>> {
        self.reporting(|editor| {
            ensure_finite(origin)?;
            let current = editor.unlocked(id)?.origin();
            let root = editor.document.docking.root_of(id);
            editor.unlocked_group(root)?;

            let delta = editor.grid().snap_point(origin).point - current;
            if delta == Vec2::ZERO {
                return Ok(Vec::new());
            }

            editor.document.push_undo();
            let before = editor.group_bounds(root);
            let moved = editor
                .document
                .docking
                .move_group(&mut editor.document.structures, root, delta)?;
            editor.sync_doors(&before);
            editor.refresh_structures(&moved);
            log::debug!("Moved structure {} by ({}, {})", id, delta.x, delta.y);
            Ok(moved)
        })
    }

    /// Resize a structure to `bounds` (snapped, floored to one cell). Docked
    /// dependents follow the new origin. A structure that is itself docked
    /// keeps its slot next to its anchor, so only its size changes.
    pub fn resize_structure(&mut self, id: StructureId, bounds: Bounds) -> EditResult<()> {
        self.reporting(|editor| {
            ensure_finite_bounds(bounds)?;
            let mut next = editor.unlocked(id)?.clone();
            editor.unlocked_group(id)?;
            let grid = editor.grid();
            next.resize(grid.snap_bounds(bounds), grid.min_size());
            let docking = &editor.document.docking;
            if let Some(origin) = docking.docked_origin(&editor.document.structures, id) {
                next.set_origin(origin);
            }
            if editor.document.structure(id).is_some_and(|current| *current == next) {
                return Ok(());
            }

            editor.document.push_undo();
            let before = editor.group_bounds(id);
            if let Some(structure) = editor.document.structure_mut(id) {
                *structure = next;
            }
            let mut moved = vec![id];
            moved.extend(
                editor
                    .document
                    .docking
                    .propagate_move(&mut editor.document.structures, id),
            );
            editor.sync_doors(&before);
            editor.refresh_structures(&moved);
            Ok(())
        })
    }

    /// Reject edits that would move a locked member of `root`'s docked group.
    fn unlocked_group(&self, root: StructureId) -> EditResult<()> {
        match self
            .document
            .docking
            .locked_member(&self.document.structures, root)
        {
            Some(locked) => Err(EditError::Locked(locked)),
            None => Ok(()),
        }
    }

    fn unlocked(&self, id: StructureId) -> EditResult<&Structure> {
        let structure = self
            .document
            .structure(id)
            .ok_or(EditError::StructureNotFound(id))?;
        if structure.locked {
            return Err(EditError::Locked(id));
        }
        Ok(structure)
    }

    // Docking

    /// Dock `target` to `anchor` at `position`, moving the target (and
    /// anything docked to it) into place. Returns the target's translation.
    pub fn dock(&mut self, anchor: StructureId, target: StructureId, position: DockPosition) -> EditResult<Vec2> {
        self.reporting(|editor| {
            editor.unlocked(target)?;
            editor.unlocked_group(target)?;
            editor.document.push_undo();
            let before = editor.group_bounds(target);
            let translation = match editor.document.docking.dock(
                &mut editor.document.structures,
                anchor,
                target,
                position,
            ) {
                Ok(translation) => translation,
                Err(err) => {
                    editor.document.discard_undo();
                    return Err(err);
                }
            };
            editor.sync_doors(&before);
            let ids: Vec<StructureId> = before.iter().map(|(id, _)| *id).chain([anchor]).collect();
            editor.refresh_structures(&ids);
            Ok(translation)
        })
    }

    /// Remove every docking relationship involving `target`. Returns how many
    /// were removed.
    pub fn undock(&mut self, target: StructureId) -> EditResult<usize> {
        self.reporting(|editor| {
            if editor.document.structure(target).is_none() {
                return Err(EditError::StructureNotFound(target));
            }
            if !editor.document.docking.is_docked(target) {
                return Ok(0);
            }
            editor.document.push_undo();
            let removed = editor.document.docking.undock(target);
            let mut ids: Vec<StructureId> = removed
                .iter()
                .flat_map(|r| [r.docked_id, r.anchor_id])
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            ids.sort_unstable();
            editor.refresh_structures(&ids);
            Ok(removed.len())
        })
    }

    /// Current bounds of `root` and everything docked to it.
    fn group_bounds(&self, root: StructureId) -> Vec<(StructureId, Bounds)> {
        std::iter::once(root)
            .chain(self.document.docking.connected_set(root))
            .filter_map(|id| self.document.structure(id).map(|s| (id, s.bounds)))
            .collect()
    }

    fn bounds_of(&self, ids: &[StructureId]) -> Vec<(StructureId, Bounds)> {
        ids.iter()
            .filter_map(|&id| self.document.structure(id).map(|s| (id, s.bounds)))
            .collect()
    }

    /// Carry doors along with walls whose bounds changed since `before`.
    ///
    /// A translated wall moves its doors by the same delta; a resized wall
    /// re-projects them onto its new outline.
    fn sync_doors(&mut self, before: &[(StructureId, Bounds)]) {
        for &(wall_id, old) in before {
            let Some(wall) = self.document.structures.get(&wall_id) else {
                continue;
            };
            if wall.bounds == old {
                continue;
            }
            let delta = wall.origin() - old.origin();
            let resized = wall.bounds.size() != old.size();
            for door_id in self.document.doors_on(wall_id) {
                let Some(door) = self.document.markers.get_mut(&door_id) else {
                    continue;
                };
                let moved = door.position() + delta;
                if resized {
                    let projection = projection::project(moved, wall);
                    door.set_position(projection.point());
                    door.data.edge = Some(projection.edge);
                    door.data.rotation = projection.rotation_degrees;
                } else {
                    door.set_position(moved);
                }
                self.collaborators
                    .renderer
                    .update_element(ElementRef::Marker(door_id));
            }
        }
    }

    fn refresh_structures(&mut self, ids: &[StructureId]) {
        for &id in ids {
            self.collaborators
                .renderer
                .update_element(ElementRef::Structure(id));
        }
    }

    // Markers

    /// Place a marker at `point`.
    ///
    /// Doors attach to the nearest wall within the door snap distance and
    /// fail with [`EditError::NoTarget`] when there is none. Teleports go
    /// through the pairing state machine: the first placement is point A,
    /// the second completes the pair.
    pub fn place_marker(&mut self, kind: MarkerKind, point: Point) -> EditResult<MarkerId> {
        self.reporting(|editor| {
            ensure_finite(point)?;
            let marker = match kind {
                MarkerKind::Door => {
                    let hit = nearest_wall(
                        point,
                        editor.document.structures_ordered(),
                        editor.config.door_snap_distance,
                    )
                    .ok_or(EditError::NoTarget("wall"))?;
                    let id = editor.document.allocate_marker_id();
                    Marker::door(id, hit.wall_id, &hit.projection)
                }
                MarkerKind::Prop => {
                    let id = editor.document.allocate_marker_id();
                    let mut marker = Marker::new(id, kind, point);
                    marker.data.width = Some(editor.document.grid_size);
                    marker.data.height = Some(editor.document.grid_size);
                    marker
                }
                _ => Marker::new(editor.document.allocate_marker_id(), kind, point),
            };

            let id = marker.id;
            editor.document.push_undo();
            editor.document.add_marker(marker);
            editor
                .collaborators
                .renderer
                .update_element(ElementRef::Marker(id));
            log::debug!("Placed {} marker {}", kind.name(), id);

            if kind == MarkerKind::Teleport {
                let event = editor.pairing.place(&mut editor.document.markers, id);
                if let PairingEvent::PairCompleted { connector, .. } = event {
                    let renderer = &mut editor.collaborators.renderer;
                    renderer.update_element(ElementRef::Marker(connector.from));
                    renderer.update_element(ElementRef::Marker(connector.to));
                    renderer.update_connector(connector);
                }
            }
            Ok(id)
        })
    }

    /// Move a marker. Doors slide onto the nearest wall (or stay on their
    /// own wall when no other wall is close enough).
    pub fn move_marker(&mut self, id: MarkerId, point: Point) -> EditResult<()> {
        self.reporting(|editor| {
            ensure_finite(point)?;
            if !editor.document.markers.contains_key(&id) {
                return Err(EditError::MarkerNotFound(id));
            }
            editor.document.push_undo();
            if let Err(err) = editor.position_marker(id, point) {
                editor.document.discard_undo();
                return Err(err);
            }
            Ok(())
        })
    }

    fn position_marker(&mut self, id: MarkerId, point: Point) -> EditResult<()> {
        let marker = self
            .document
            .markers
            .get(&id)
            .ok_or(EditError::MarkerNotFound(id))?;

        if marker.kind.attaches_to_wall() {
            let own_wall = marker
                .data
                .wall_id
                .and_then(|wall_id| self.document.structures.get(&wall_id));
            let (wall_id, projection) = nearest_wall(
                point,
                self.document.structures_ordered(),
                self.config.door_snap_distance,
            )
            .map(|hit| (hit.wall_id, hit.projection))
            .or_else(|| own_wall.map(|wall| (wall.id, projection::project(point, wall))))
            .ok_or(EditError::NoTarget("wall"))?;

            if let Some(marker) = self.document.markers.get_mut(&id) {
                marker.set_position(projection.point());
                marker.data.wall_id = Some(wall_id);
                marker.data.edge = Some(projection.edge);
                marker.data.rotation = projection.rotation_degrees;
            }
        } else if let Some(marker) = self.document.markers.get_mut(&id) {
            marker.set_position(point);
        }

        self.collaborators
            .renderer
            .update_element(ElementRef::Marker(id));
        if let Some(connector) = self.pairing.connector_for(id) {
            self.collaborators.renderer.update_connector(connector);
        }
        Ok(())
    }

    /// Delete a marker. A teleport's partner is unlinked and their connector
    /// removed.
    pub fn delete_marker(&mut self, id: MarkerId) -> EditResult<()> {
        self.reporting(|editor| {
            if !editor.document.markers.contains_key(&id) {
                return Err(EditError::MarkerNotFound(id));
            }
            if editor
                .marker_drag
                .as_ref()
                .is_some_and(|drag| drag.original.id == id)
            {
                editor.marker_drag = None;
                editor.document.discard_undo();
            }
            editor.document.push_undo();
            editor.remove_marker(id);
            Ok(())
        })
    }

    /// Apply a property edit to a marker's data.
    ///
    /// Pairing and wall attachment are owned by the editor, so those fields are
    /// restored after `edit` runs.
    pub fn edit_marker_data(&mut self, id: MarkerId, edit: impl FnOnce(&mut MarkerData)) -> EditResult<()> {
        self.reporting(|editor| {
            let before = editor
                .document
                .marker(id)
                .ok_or(EditError::MarkerNotFound(id))?
                .data
                .clone();
            let mut data = before.clone();
            edit(&mut data);
            data.pair_id = before.pair_id;
            data.is_point_a = before.is_point_a;
            data.has_pair = before.has_pair;
            data.paired_marker = before.paired_marker;
            data.wall_id = before.wall_id;
            data.edge = before.edge;
            data.width = data.width.map(|width| width.max(1.0));
            data.height = data.height.map(|height| height.max(1.0));
            if data == before {
                return Ok(());
            }
            editor.document.push_undo();
            if let Some(marker) = editor.document.markers.get_mut(&id) {
                marker.data = data;
            }
            editor
                .collaborators
                .renderer
                .update_element(ElementRef::Marker(id));
            Ok(())
        })
    }

    fn remove_marker(&mut self, id: MarkerId) {
        let Some(removed) = self.document.markers.remove(&id) else {
            return;
        };
        let dropped = self.pairing.on_removed(&mut self.document.markers, &removed);
        if self.selection == Some(Selection::Marker(id)) {
            self.selection = None;
        }

        let renderer = &mut self.collaborators.renderer;
        renderer.remove_element(ElementRef::Marker(id));
        for connector in dropped {
            renderer.remove_connector(connector);
            let partner = if connector.from == id {
                connector.to
            } else {
                connector.from
            };
            renderer.update_element(ElementRef::Marker(partner));
        }
        log::debug!("Deleted marker {}", id);
    }

    /// Delete whatever is selected.
    pub fn delete_selected(&mut self) -> EditResult<()> {
        match self.selection {
            Some(Selection::Structure(id)) => self.delete_structure(id),
            Some(Selection::Marker(id)) => self.delete_marker(id),
            None => Ok(()),
        }
    }

    // Tools and cancellation

    /// Switch tools. Leaving the teleport tool with only point A placed
    /// discards that point.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.cancel_drag();
        self.cancel_marker_drag();
        self.panning = false;
        if self.tools.set_tool(tool) {
            self.cancel_pending_teleport();
        }
        log::debug!("Tool: {}", tool.name());
    }

    /// Abort everything in progress (Escape): drags are rolled back, tool
    /// buffers cleared and a half-placed teleport pair discarded.
    pub fn cancel(&mut self) {
        self.cancel_drag();
        self.cancel_marker_drag();
        self.tools.cancel();
        self.cancel_pending_teleport();
        self.panning = false;
    }

    fn cancel_drag(&mut self) {
        let before = self.bounds_of(&self.drag.affected());
        let Some(outcome) = self.drag.cancel(&mut self.document.structures) else {
            return;
        };
        self.document.discard_undo();
        if outcome.changed {
            self.sync_doors(&before);
            self.refresh_structures(&outcome.affected);
        }
    }

    fn cancel_marker_drag(&mut self) {
        let Some(drag) = self.marker_drag.take() else {
            return;
        };
        self.document.discard_undo();
        if drag.changed {
            let id = drag.original.id;
            self.document.markers.insert(id, drag.original);
            self.collaborators
                .renderer
                .update_element(ElementRef::Marker(id));
            if let Some(connector) = self.pairing.connector_for(id) {
                self.collaborators.renderer.update_connector(connector);
            }
        }
    }

    fn cancel_pending_teleport(&mut self) {
        if let Some(marker) = self.pairing.cancel(&mut self.document.markers) {
            self.document.discard_undo_if_unchanged();
            if self.selection == Some(Selection::Marker(marker.id)) {
                self.selection = None;
            }
            self.collaborators
                .renderer
                .remove_element(ElementRef::Marker(marker.id));
        }
    }

    // View

    pub fn zoom_at(&mut self, cursor_screen: Point, scale: f64) {
        self.camera.zoom_at(cursor_screen, scale);
    }

    pub fn zoom_by(&mut self, cursor_screen: Point, factor: f64) {
        self.camera.zoom_by(cursor_screen, factor);
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.camera.pan(delta);
    }

    /// Fit the whole map into a viewport of the given size.
    pub fn fit_to_content(&mut self, viewport: kurbo::Size, padding: f64) {
        match self.document.bounds() {
            Some(bounds) => self.camera.fit_to_bounds(bounds, viewport, padding),
            None => self.camera.reset(),
        }
    }

    // History

    pub fn undo(&mut self) -> bool {
        self.step_history(MapDocument::undo)
    }

    pub fn redo(&mut self) -> bool {
        self.step_history(MapDocument::redo)
    }

    fn step_history(&mut self, step: fn(&mut MapDocument) -> bool) -> bool {
        self.cancel_drag();
        self.cancel_marker_drag();
        let before = self.element_refs();
        let old_connectors = self.pairing.connectors().to_vec();
        if !step(&mut self.document) {
            return false;
        }
        self.pairing.reconstruct(&mut self.document.markers);
        self.pairing.resume_pending(&self.document.markers);

        let after = self.element_refs();
        let renderer = &mut self.collaborators.renderer;
        for connector in old_connectors {
            renderer.remove_connector(connector);
        }
        for element in before.difference(&after) {
            renderer.remove_element(*element);
        }
        for element in &after {
            renderer.update_element(*element);
        }
        for connector in self.pairing.connectors() {
            renderer.update_connector(*connector);
        }
        self.collaborators.layers.update_layers_list();

        let selection_alive = match self.selection {
            Some(Selection::Structure(id)) => after.contains(&ElementRef::Structure(id)),
            Some(Selection::Marker(id)) => after.contains(&ElementRef::Marker(id)),
            None => true,
        };
        if !selection_alive {
            self.selection = None;
        }
        true
    }

    fn element_refs(&self) -> HashSet<ElementRef> {
        self.document
            .structures
            .keys()
            .map(|&id| ElementRef::Structure(id))
            .chain(self.document.markers.keys().map(|&id| ElementRef::Marker(id)))
            .collect()
    }
}

fn ensure_finite(point: Point) -> EditResult<()> {
    if point.is_finite() {
        Ok(())
    } else {
        Err(EditError::InvalidGeometry(format!("non-finite point {:?}", point)))
    }
}

fn ensure_finite_bounds(bounds: Bounds) -> EditResult<()> {
    if [bounds.x, bounds.y, bounds.width, bounds.height]
        .iter()
        .all(|v| v.is_finite())
    {
        Ok(())
    } else {
        Err(EditError::InvalidGeometry(format!("non-finite bounds {:?}", bounds)))
    }
}
