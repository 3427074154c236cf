//! # flowdef-base
//!
//! Core library for flow-definition documents: an object model kept in
//! two-way sync with its XML, reference resolution between states and
//! transitions, a schema-ordered insertion policy and a validation pass.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! project     → Flow registry, per-document locks, file loading
//!   ↓
//! validation  → Rule table, validation context, problems
//!   ↓
//! visit       → Whole-graph visitor with pruning and cancellation
//!   ↓
//! model       → Typed element graph, editing, transition links, events
//!   ↓
//! document    → XML node tree, ordering policy, read/write
//!   ↓
//! base        → Element vocabulary, identities, positions, constants
//! ```

// ============================================================================
// MODULES (dependency order: base → document → model → visit → validation → project)
// ============================================================================

/// Foundation types: element kinds, identities, TextRange, constants
pub mod base;

/// Document: XML node tree with lossless read/write and the ordering policy
pub mod document;

/// Model: flow elements projected over a document
pub mod model;

/// Visitor protocol over the model
pub mod visit;

/// Validation rules and problem reporting
pub mod validation;

/// Registry of independently loaded flows
pub mod project;

// Re-export commonly needed items
pub use base::{ElementKind, LineCol, LineIndex, TextRange, TextSize};
pub use document::{Document, DocumentError, XmlOptions};
pub use model::{ElementId, FlowModel, ModelError};
pub use validation::{FlowValidator, ValidationContext, ValidationOptions, ValidationReport};
