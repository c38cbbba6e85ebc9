//! oda-fetch Core Library
//!
//! Retrieves data files from the data.go.kr public data portal given only a
//! public data id (`publicDataPk`). The portal has no stable file API, so the
//! client replays its page flow: prime a cookie session, probe a bounded range
//! of candidate file sequences for the attachment descriptor, then fetch the
//! bytes from the direct download endpoint.
//!
//! # Architecture
//!
//! - [`config`] - explicit origin configuration and config-file loading
//! - [`download`] - the retrieval flow (session, metadata, direct download,
//!   filename derivation, delivery)
//! - [`server`] - axum HTTP front serving retrieved files to browsers

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod server;
#[cfg(test)]
pub mod test_support;
pub mod user_agent;

// Re-export commonly used types
pub use config::{FileConfig, OriginConfig, load_file_config};
pub use download::{
    Delivery, DeliveryMode, FileDescriptor, RetrievalClient, RetrievalError, RetrievalRequest,
    RetrievalResult, SavedFile,
};
