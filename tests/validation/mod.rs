//! Validation layer tests
//!
//! Tests for the rule table and the validation pass:
//! - Per-kind rules and their messages
//! - Deterministic, cancellable runs

pub mod tests_determinism;
pub mod tests_rules;
