//! Persisted map document and undo history.

use crate::docking::{DockingGraph, StructureMap};
use crate::markers::{Marker, MarkerId, MarkerMap};
use crate::shapes::{Structure, StructureId};
use crate::snap::{GRID_SIZE, SnapMode};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Maximum number of undo states to keep.
const MAX_UNDO_HISTORY: usize = 50;

/// Named group of structures in the layers panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub name: String,
    #[serde(default)]
    pub structure_ids: Vec<StructureId>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            structure_ids: Vec::new(),
        }
    }
}

/// A snapshot of document state for undo/redo.
#[derive(Debug, Clone, PartialEq)]
struct DocumentSnapshot {
    structures: StructureMap,
    z_order: Vec<StructureId>,
    markers: MarkerMap,
    folders: Vec<Folder>,
    docking: DockingGraph,
}

fn default_grid_size() -> f64 {
    GRID_SIZE
}

fn default_name() -> String {
    "Untitled map".to_string()
}

/// A map document containing every structure, marker and relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDocument {
    /// Unique document identifier.
    pub id: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,
    #[serde(default)]
    pub snap_mode: SnapMode,
    #[serde(default)]
    pub structures: StructureMap,
    /// Draw order of structures (back to front).
    #[serde(default)]
    pub z_order: Vec<StructureId>,
    #[serde(default)]
    pub markers: MarkerMap,
    #[serde(default)]
    pub folders: Vec<Folder>,
    /// Docking relationships. Older maps have none and load undocked.
    #[serde(default)]
    pub docking: DockingGraph,
    #[serde(default)]
    next_structure_id: StructureId,
    #[serde(default)]
    next_marker_id: MarkerId,
    #[serde(skip)]
    undo_stack: Vec<DocumentSnapshot>,
    #[serde(skip)]
    redo_stack: Vec<DocumentSnapshot>,
}

impl Default for MapDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MapDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: default_name(),
            grid_size: GRID_SIZE,
            snap_mode: SnapMode::default(),
            structures: StructureMap::new(),
            z_order: Vec::new(),
            markers: MarkerMap::new(),
            folders: Vec::new(),
            docking: DockingGraph::new(),
            next_structure_id: 1,
            next_marker_id: 1,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            structures: self.structures.clone(),
            z_order: self.z_order.clone(),
            markers: self.markers.clone(),
            folders: self.folders.clone(),
            docking: self.docking.clone(),
        }
    }

    fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.structures = snapshot.structures;
        self.z_order = snapshot.z_order;
        self.markers = snapshot.markers;
        self.folders = snapshot.folders;
        self.docking = snapshot.docking;
    }

    /// Push current state to undo stack (call before making changes).
    pub fn push_undo(&mut self) {
        let snapshot = self.snapshot();
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    /// Drop the most recent undo state without restoring it, for edits
    /// that turned out to change nothing.
    pub fn discard_undo(&mut self) {
        self.undo_stack.pop();
    }

    /// Drop the most recent undo state if the document is back to it.
    /// Returns whether a state was dropped.
    pub fn discard_undo_if_unchanged(&mut self) -> bool {
        if self.undo_stack.last().is_some_and(|top| *top == self.snapshot()) {
            self.undo_stack.pop();
            true
        } else {
            false
        }
    }

    /// Undo the last change.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        self.redo_stack.push(self.snapshot());
        self.restore(snapshot);
        true
    }

    /// Redo the last undone change.
    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push(self.snapshot());
        self.restore(snapshot);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Allocate a fresh structure id.
    pub fn allocate_structure_id(&mut self) -> StructureId {
        let floor = self.structures.keys().max().map_or(1, |max| max + 1);
        let id = self.next_structure_id.max(floor);
        self.next_structure_id = id + 1;
        id
    }

    /// Allocate a fresh marker id.
    pub fn allocate_marker_id(&mut self) -> MarkerId {
        let floor = self.markers.keys().max().map_or(1, |max| max + 1);
        let id = self.next_marker_id.max(floor);
        self.next_marker_id = id + 1;
        id
    }

    /// Add a structure on top of the draw order.
    pub fn add_structure(&mut self, structure: Structure) {
        let id = structure.id;
        self.z_order.retain(|&other| other != id);
        self.z_order.push(id);
        self.structures.insert(id, structure);
    }

    /// Remove a structure along with every docking relationship and folder
    /// entry that references it.
    pub fn remove_structure(&mut self, id: StructureId) -> Option<Structure> {
        let removed = self.structures.remove(&id)?;
        self.z_order.retain(|&other| other != id);
        for folder in &mut self.folders {
            folder.structure_ids.retain(|&other| other != id);
        }
        self.docking.remove_structure(id);
        Some(removed)
    }

    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(&id)
    }

    pub fn structure_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.structures.get_mut(&id)
    }

    /// Structures in draw order (back to front).
    pub fn structures_ordered(&self) -> impl Iterator<Item = &Structure> {
        self.z_order.iter().filter_map(|id| self.structures.get(id))
    }

    /// Topmost structure under `point`.
    pub fn structure_at(&self, point: Point, tolerance: f64) -> Option<StructureId> {
        self.z_order
            .iter()
            .rev()
            .copied()
            .find(|id| {
                self.structures
                    .get(id)
                    .is_some_and(|s| s.hit_test(point, tolerance))
            })
    }

    pub fn add_marker(&mut self, marker: Marker) {
        self.markers.insert(marker.id, marker);
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    /// Closest marker within `radius` of `point`.
    pub fn marker_at(&self, point: Point, radius: f64) -> Option<MarkerId> {
        self.markers
            .values()
            .map(|m| (m.id, (m.position() - point).hypot()))
            .filter(|&(_, distance)| distance <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(id, _)| id)
    }

    /// Doors attached to the given wall, sorted by id.
    pub fn doors_on(&self, wall_id: StructureId) -> Vec<MarkerId> {
        let mut ids: Vec<MarkerId> = self
            .markers
            .values()
            .filter(|m| m.data.wall_id == Some(wall_id))
            .map(|m| m.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Add a folder, returning its index.
    pub fn add_folder(&mut self, folder: Folder) -> usize {
        self.folders.push(folder);
        self.folders.len() - 1
    }

    /// Get the bounding box of all structures.
    pub fn bounds(&self) -> Option<Rect> {
        self.structures
            .values()
            .map(|s| s.bounds.to_rect())
            .reduce(|a, b| a.union(b))
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty() && self.markers.is_empty()
    }

    /// Bring the loaded state back in line with its invariants: drop dangling
    /// ids from the draw order, folders and docking graph, and add any
    /// structure missing from the draw order. Returns the number of repairs.
    pub fn repair(&mut self) -> usize {
        let mut repairs = 0;

        let before = self.z_order.len();
        let mut seen = HashSet::new();
        let structures = &self.structures;
        self.z_order
            .retain(|id| structures.contains_key(id) && seen.insert(*id));
        repairs += before - self.z_order.len();

        let mut missing: Vec<StructureId> = self
            .structures
            .keys()
            .filter(|id| !seen.contains(*id))
            .copied()
            .collect();
        missing.sort_unstable();
        repairs += missing.len();
        self.z_order.extend(missing);

        for folder in &mut self.folders {
            let before = folder.structure_ids.len();
            folder.structure_ids.retain(|id| structures.contains_key(id));
            let dropped = before - folder.structure_ids.len();
            if dropped > 0 {
                log::warn!("Folder '{}' referenced {} missing structures", folder.name, dropped);
            }
            repairs += dropped;
        }

        repairs += self.docking.prune(&self.structures);

        if !(self.grid_size.is_finite() && self.grid_size > 0.0) {
            log::warn!("Invalid grid size {}, using {}", self.grid_size, GRID_SIZE);
            self.grid_size = GRID_SIZE;
            repairs += 1;
        }

        repairs
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
