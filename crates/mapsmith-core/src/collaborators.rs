//! Interfaces to the parts of the application that live outside the core.
//!
//! The editor never draws, lists layers or shows messages itself. It tells
//! these collaborators what changed and lets them read the document back.
//! Every method has a no-op default so hosts implement only what they need.

use crate::error::EditError;
use crate::markers::{Connector, MarkerId};
use crate::shapes::StructureId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a drawable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementRef {
    Structure(StructureId),
    Marker(MarkerId),
}

/// Severity of a user notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl From<&EditError> for Notice {
    fn from(err: &EditError) -> Self {
        let level = match err {
            EditError::NoTarget(_) | EditError::Locked(_) | EditError::InvalidGeometry(_) => {
                NoticeLevel::Warning
            }
            EditError::InvalidDock { .. } => NoticeLevel::Warning,
            EditError::StructureNotFound(_)
            | EditError::MarkerNotFound(_)
            | EditError::Dangling(_) => NoticeLevel::Error,
        };
        Self {
            level,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.level, self.message)
    }
}

/// Draws structures, markers and teleport connectors.
pub trait Renderer {
    /// An element was created or changed and must be redrawn.
    fn update_element(&mut self, _element: ElementRef) {}

    /// An element was deleted.
    fn remove_element(&mut self, _element: ElementRef) {}

    fn update_connector(&mut self, _connector: Connector) {}

    fn remove_connector(&mut self, _connector: Connector) {}
}

/// The structure list in the side panel.
pub trait LayersPanel {
    /// Structures were added, removed or renamed.
    fn update_layers_list(&mut self) {}
}

/// Toasts, status bar messages and the like.
pub trait Notifier {
    fn notify(&mut self, _notice: Notice) {}
}

/// Collaborator that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCollaborator;

impl Renderer for NullCollaborator {}
impl LayersPanel for NullCollaborator {}
impl Notifier for NullCollaborator {}

/// The set of collaborators an editor talks to.
pub struct Collaborators {
    pub renderer: Box<dyn Renderer>,
    pub layers: Box<dyn LayersPanel>,
    pub notifier: Box<dyn Notifier>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            renderer: Box::new(NullCollaborator),
            layers: Box::new(NullCollaborator),
            notifier: Box::new(NullCollaborator),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_layers(mut self, layers: impl LayersPanel + 'static) -> Self {
        self.layers = Box::new(layers);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }
}
