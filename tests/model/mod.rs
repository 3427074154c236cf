//! Model layer tests
//!
//! Tests for the flow object model over its document:
//! - Lossless round trip
//! - Schema-ordered insertion
//! - Transition reconnection after edits
//! - Rename propagation and idempotent removal
//! - End-to-end editing scenarios

pub mod tests_editing;
pub mod tests_ordering;
pub mod tests_reconnection;
pub mod tests_round_trip;
pub mod tests_scenarios;
