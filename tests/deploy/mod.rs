//! Deployment tests
//!
//! Tests for publishing apps through a recording transport:
//! - Request shape (endpoint, query parameters, archive)
//! - Status handling and transport failures
