//! Foundation types for the flowdef crate.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`ElementKind`] - The closed flow element vocabulary and registration table
//! - [`ActionType`], [`Branch`] - Context tags assigned during construction
//! - [`ElementIdentity`] - Typed or opaque element keys
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - Domain constants (well-known names, scopes, type aliases)
//!
//! This module has NO dependencies on other flowdef modules.

pub mod constants;
mod identity;
mod kind;
mod span;

pub use identity::ElementIdentity;
pub use kind::{ActionType, Branch, ElementKind, Slot};
pub use span::{LineCol, LineIndex, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
