//! Error types for the retrieval flow.
//!
//! Every variant carries the context (public data id, URL, path) a caller
//! needs to report the failure without re-deriving it.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while retrieving a data file from the origin.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The caller-supplied public data id is blank.
    #[error("invalid public data id: {id:?}")]
    InvalidId {
        /// The rejected identifier.
        id: String,
    },

    /// An origin endpoint URL could not be built from the configured base URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The URL (or base URL) that failed to parse.
        url: String,
    },

    /// The origin configuration violates an invariant.
    #[error("invalid origin configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The per-retrieval HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request exceeded the configured per-call timeout.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Every candidate file sequence was probed without yielding an attachment id.
    #[error(
        "파일 메타데이터를 찾지 못했습니다 (file metadata not found) for publicDataPk {public_data_id} after probing {probed} candidates"
    )]
    DescriptorNotFound {
        /// The public data id being resolved.
        public_data_id: String,
        /// Number of candidate sequences probed.
        probed: usize,
    },

    /// The download endpoint answered with an HTML page instead of a file payload.
    #[error("origin returned an HTML page instead of a file from {url} (content-type {content_type})")]
    OriginErrorPage {
        /// The download URL.
        url: String,
        /// The content type the origin declared.
        content_type: String,
    },

    /// The download endpoint answered without a body.
    #[error("origin returned an empty payload from {url} (HTTP {status})")]
    EmptyPayload {
        /// The download URL.
        url: String,
        /// HTTP status of the download response.
        status: u16,
    },

    /// File system error while persisting a payload.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl RetrievalError {
    /// Creates an invalid id error.
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId { id: id.into() }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Maps a reqwest send/read failure onto `Timeout` or `Network`.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates a descriptor-not-found error.
    pub fn descriptor_not_found(public_data_id: impl Into<String>, probed: usize) -> Self {
        Self::DescriptorNotFound {
            public_data_id: public_data_id.into(),
            probed,
        }
    }

    /// Creates an origin error page error.
    pub fn origin_error_page(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::OriginErrorPage {
            url: url.into(),
            content_type: content_type.into(),
        }
    }

    /// Creates an empty payload error.
    pub fn empty_payload(url: impl Into<String>, status: u16) -> Self {
        Self::EmptyPayload {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true when the failure is a resolution miss rather than a transport fault.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DescriptorNotFound { .. })
    }

    /// Stable short label for the error kind, used in the HTTP error envelope.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidId { .. } => "invalid_id",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::ClientBuild { .. } => "client_build",
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::DescriptorNotFound { .. } => "metadata_not_found",
            Self::OriginErrorPage { .. } => "origin_error_page",
            Self::EmptyPayload { .. } => "empty_payload",
            Self::Io { .. } => "io",
        }
    }
}
