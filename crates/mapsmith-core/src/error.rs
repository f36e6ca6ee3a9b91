//! Error types for editing operations.

use crate::markers::MarkerId;
use crate::shapes::StructureId;
use thiserror::Error;

/// Errors raised by editing operations.
///
/// None of these are fatal. The editor turns every one of them into a
/// user notice and leaves its state unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("No {0} found near the cursor")]
    NoTarget(&'static str),
    #[error("Structure {0} is locked")]
    Locked(StructureId),
    #[error("Structure not found: {0}")]
    StructureNotFound(StructureId),
    #[error("Marker not found: {0}")]
    MarkerNotFound(MarkerId),
    #[error("Cannot dock structure {target} to {anchor}: {reason}")]
    InvalidDock {
        anchor: StructureId,
        target: StructureId,
        reason: &'static str,
    },
    #[error("Dangling reference: {0}")]
    Dangling(String),
}

/// Result type for editing operations.
pub type EditResult<T> = Result<T, EditError>;
