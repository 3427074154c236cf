//! Shared fixtures and assertions for the integration tests.

pub mod flow_fixtures;
pub mod model_helpers;
