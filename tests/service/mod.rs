//! Service tests
//!
//! Tests for the transactional facade:
//! - Rollback of failed imports and publishes
//! - Target validation for new-version imports

pub mod tests_service;
