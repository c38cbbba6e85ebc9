//! Shared helpers for integration tests.

#[allow(dead_code)]
#[path = "../../src/test_support/mock_origin.rs"]
pub mod mock_origin;
