//! Error types for document operations.

use thiserror::Error;

use super::NodeId;

/// Errors that can occur while reading, writing or mutating a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// XML parsing or serialization error.
    #[error("XML error: {0}")]
    Xml(String),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input is not valid UTF-8.
    #[error("Invalid UTF-8: {0}")]
    Utf8(String),

    /// The document has no root element.
    #[error("Document has no root element")]
    MissingRoot,

    /// The root element is not the expected one.
    #[error("Unexpected root element: expected '{expected}', found '{found}'")]
    UnexpectedRoot { expected: &'static str, found: String },

    /// Structural operation on a node that is not part of the tree.
    #[error("Node {0} is detached")]
    Detached(NodeId),

    /// Node handle does not belong to this document.
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    /// Node is already part of a tree and must be removed first.
    #[error("Node {0} already has a parent")]
    AlreadyAttached(NodeId),

    /// Operation needs an element node.
    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    /// `child` is not a child of `parent`.
    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
}

impl DocumentError {
    /// Create an XML error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml(message.into())
    }

    /// Create a UTF-8 error.
    pub fn utf8(message: impl Into<String>) -> Self {
        Self::Utf8(message.into())
    }
}
