//! Shared helpers for unit tests that need a mock origin.

pub mod mock_origin;
