//! Error types for model operations.

use thiserror::Error;

use super::ElementId;
use crate::base::ElementKind;
use crate::document::DocumentError;

/// Errors raised by structural model operations.
///
/// Construction anomalies and dangling references are not errors; they are
/// reported by validation. These variants cover broken preconditions.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Underlying document error.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Handle does not name a live element of this model.
    #[error("Unknown element {0}")]
    UnknownElement(ElementId),

    /// Structural operation on an element that is not part of the tree.
    #[error("Element {0} is detached")]
    Detached(ElementId),

    /// The element is still part of a tree.
    #[error("Element {0} is attached")]
    Attached(ElementId),

    /// Element has the wrong kind for the operation.
    #[error("Expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: ElementKind,
    },

    /// `parent` does not accept children of kind `child`.
    #[error("'{parent}' cannot contain '{child}'")]
    IllegalChild {
        parent: ElementKind,
        child: ElementKind,
    },

    /// `child` was created for a different parent.
    #[error("Element {child} does not belong to {parent}")]
    NotOwned { parent: ElementId, child: ElementId },

    /// A single-valued slot already holds an element.
    #[error("Element {parent} already has a '{kind}' child")]
    SlotOccupied { parent: ElementId, kind: ElementKind },

    /// The element arena has no handle left to give out.
    #[error("Too many elements in one model")]
    ArenaFull,
}

impl ModelError {
    /// Create a wrong-kind error.
    pub fn wrong_kind(expected: &'static str, found: ElementKind) -> Self {
        Self::WrongKind { expected, found }
    }
}
