//! Archive tests
//!
//! Tests for app archive export and import:
//! - Portable round trip into an empty store
//! - Idempotent merge into an existing app
//! - Deployable layout and event-registry documents
//! - Rejected input and failure reporting

pub mod tests_export;
pub mod tests_merge;
pub mod tests_scenario;
