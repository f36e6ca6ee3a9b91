//! Mapsmith Core Library
//!
//! Platform-agnostic editing core for tabletop RPG floor plans: structures
//! (rooms and walls), markers (doors, teleports, props, ...), grid snapping,
//! docking, wall projection and the editor session tying them together.

pub mod camera;
pub mod collaborators;
pub mod docking;
pub mod document;
pub mod editor;
pub mod error;
pub mod input;
pub mod markers;
pub mod projection;
pub mod selection;
pub mod shapes;
pub mod snap;
pub mod storage;
pub mod tools;

pub use camera::Camera;
pub use collaborators::{Collaborators, ElementRef, LayersPanel, Notice, NoticeLevel, Notifier, Renderer};
pub use docking::{DockPosition, DockingGraph, DockingRelationship};
pub use document::{Folder, MapDocument};
pub use editor::{Editor, EditorConfig, Selection};
pub use error::{EditError, EditResult};
pub use input::{InputState, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use markers::{Connector, Marker, MarkerId, MarkerKind, PairingState, TeleportPairing};
pub use projection::{EdgeLabel, ProjectionResult, WallHit, nearest_wall, project};
pub use selection::{Corner, DragState};
pub use shapes::{Bounds, ShapeKind, Structure, StructureId, StructureKind};
pub use snap::{GRID_SIZE, Grid, SnapMode, SnapResult};
pub use storage::{MemoryStorage, Storage, StorageError, StorageResult};
pub use tools::{ToolKind, ToolManager};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
