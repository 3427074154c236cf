//! Project layer tests
//!
//! Tests for the flow registry: file loading and parallel validation.

pub mod tests_registry;
