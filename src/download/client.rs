//! Retrieval client: the end-to-end flow from public data id to file bytes.
//!
//! Each call runs one self-contained sequence of round-trips against the
//! origin:
//!
//! 1. create a [`SessionContext`] (fresh cookie jar, referer)
//! 2. prime the session (best-effort)
//! 3. resolve a [`FileDescriptor`] by probing candidate sequences
//! 4. fetch the bytes from the direct download endpoint
//! 5. derive the filename
//!
//! Nothing is cached or shared between calls. Dropping the returned future
//! aborts the in-flight request.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, instrument};

use super::constants::DEFAULT_CANDIDATE_SEQUENCE;
use super::delivery::{Delivery, DeliveryMode, SavedFile, save_to_disk};
use super::direct::fetch_payload;
use super::error::RetrievalError;
use super::filename::resolve_filename;
use super::metadata::{FileDescriptor, resolve_descriptor};
use super::session::SessionContext;
use crate::config::OriginConfig;

/// Input to one retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    /// Opaque public data id (`publicDataPk`), used exactly as given.
    pub public_data_id: String,
    /// Candidate file sequence to probe first. Only affects latency.
    pub candidate_sequence: Option<u32>,
}

impl RetrievalRequest {
    /// Request for `public_data_id` with no preferred candidate.
    pub fn new(public_data_id: impl Into<String>) -> Self {
        Self {
            public_data_id: public_data_id.into(),
            candidate_sequence: None,
        }
    }

    /// Sets the candidate probed first.
    #[must_use]
    pub fn with_candidate(mut self, candidate_sequence: u32) -> Self {
        self.candidate_sequence = Some(candidate_sequence);
        self
    }
}

/// A retrieved file held in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievalResult {
    /// Raw payload bytes.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Never empty; falls back to `downloaded-file-<id>`.
    pub file_name: String,
    /// Lower-cased; `application/octet-stream` when the origin gives none.
    pub content_type: String,
}

/// Client for retrieving data files from the portal.
///
/// Holds only configuration, so one instance can serve any number of
/// concurrent retrievals; each retrieval builds its own session.
///
/// # Example
///
/// ```no_run
/// use oda_fetch::{OriginConfig, RetrievalClient, RetrievalRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RetrievalClient::new(OriginConfig::default())?;
/// let result = client.retrieve(&RetrievalRequest::new("3074462")).await?;
/// println!("{} ({}, {} bytes)", result.file_name, result.content_type, result.bytes.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetrievalClient {
    config: OriginConfig,
}

impl RetrievalClient {
    /// Creates a client for the given origin.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`OriginConfig::validate`].
    pub fn new(config: OriginConfig) -> Result<Self, RetrievalError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The origin configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &OriginConfig {
        &self.config
    }

    /// Runs the full flow and returns the payload in memory.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidId`] for an empty or all-whitespace id,
    /// [`RetrievalError::DescriptorNotFound`] when no candidate resolves, a
    /// transport error from any origin call after priming, or
    /// [`RetrievalError::OriginErrorPage`] when HTML payloads are rejected.
    #[instrument(skip(self), fields(public_data_id = %request.public_data_id))]
    pub async fn retrieve(
        &self,
        request: &RetrievalRequest,
    ) -> Result<RetrievalResult, RetrievalError> {
        let public_data_id = request.public_data_id.as_str();
        if public_data_id.trim().is_empty() {
            return Err(RetrievalError::invalid_id(public_data_id));
        }

        let session = SessionContext::new(&self.config, public_data_id)?;
        let priming = session.prime().await;
        if !priming.detail_page.is_success() || !priming.check_file_type.is_success() {
            info!(?priming, "session priming incomplete, continuing");
        }

        let preferred = request
            .candidate_sequence
            .unwrap_or(DEFAULT_CANDIDATE_SEQUENCE);
        let descriptor: FileDescriptor =
            resolve_descriptor(&session, preferred, self.config.max_candidates).await?;

        let payload = fetch_payload(&session, &descriptor, self.config.reject_html_payload).await?;
        let file_name = resolve_filename(
            descriptor.declared_name.as_deref(),
            payload.content_disposition.as_deref(),
            public_data_id,
        );

        info!(
            file_name = %file_name,
            content_type = %payload.content_type,
            bytes = payload.bytes.len(),
            status = payload.status,
            "retrieval complete"
        );

        Ok(RetrievalResult {
            bytes: payload.bytes,
            file_name,
            content_type: payload.content_type,
        })
    }

    /// Runs the flow and delivers the payload as `mode` asks.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`retrieve`](Self::retrieve), plus
    /// [`RetrievalError::Io`] in disk mode.
    pub async fn retrieve_file(
        &self,
        request: &RetrievalRequest,
        mode: DeliveryMode,
    ) -> Result<Delivery, RetrievalError> {
        let result = self.retrieve(request).await?;
        match mode {
            DeliveryMode::Buffer => Ok(Delivery::Buffered(result)),
            DeliveryMode::Disk { save_path } => {
                Ok(Delivery::Saved(save_to_disk(&result, &save_path).await?))
            }
        }
    }

    /// Buffer-mode convenience for HTTP handlers.
    ///
    /// # Errors
    ///
    /// Same as [`retrieve`](Self::retrieve).
    pub async fn retrieve_to_buffer(
        &self,
        public_data_id: &str,
        candidate_sequence: Option<u32>,
    ) -> Result<RetrievalResult, RetrievalError> {
        let request = RetrievalRequest {
            public_data_id: public_data_id.to_string(),
            candidate_sequence,
        };
        self.retrieve(&request).await
    }

    /// Disk-mode convenience; returns the saved file with its absolute path.
    ///
    /// # Errors
    ///
    /// Same as [`retrieve_file`](Self::retrieve_file).
    pub async fn retrieve_to_disk(
        &self,
        public_data_id: &str,
        candidate_sequence: Option<u32>,
        save_path: impl Into<PathBuf>,
    ) -> Result<SavedFile, RetrievalError> {
        let request = RetrievalRequest {
            public_data_id: public_data_id.to_string(),
            candidate_sequence,
        };
        let result = self.retrieve(&request).await?;
        save_to_disk(&result, &save_path.into()).await
    }
}
