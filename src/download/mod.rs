//! Remote file retrieval from the data.go.kr portal.
//!
//! The portal exposes no stable API from a public data id to its file, so
//! retrieval replays the portal's own page flow:
//!
//! - [`session`] - per-retrieval cookie jar, referer, best-effort priming
//! - [`metadata`] - candidate probing and descriptor extraction
//! - [`direct`] - the byte-fetching request
//! - [`filename`] - declared name / `Content-Disposition` / fallback
//! - [`delivery`] - in-memory and on-disk delivery
//!
//! # Example
//!
//! ```no_run
//! use oda_fetch::download::{DeliveryMode, RetrievalClient, RetrievalRequest};
//! use oda_fetch::OriginConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RetrievalClient::new(OriginConfig::default())?;
//! let delivery = client
//!     .retrieve_file(
//!         &RetrievalRequest::new("3074462"),
//!         DeliveryMode::Disk { save_path: "./downloads/".into() },
//!     )
//!     .await?;
//! println!("saved {}", delivery.file_name());
//! # Ok(())
//! # }
//! ```

mod client;
pub(crate) mod constants;
pub mod delivery;
pub mod direct;
mod error;
pub mod filename;
pub mod metadata;
pub mod session;

pub use client::{RetrievalClient, RetrievalRequest, RetrievalResult};
pub use constants::{
    DEFAULT_CANDIDATE_SEQUENCE, DEFAULT_CONTENT_TYPE, DEFAULT_MAX_CANDIDATES,
    FALLBACK_FILENAME_PREFIX,
};
pub use delivery::{Delivery, DeliveryMode, SavedFile, save_to_disk};
pub use direct::{DirectPayload, fetch_payload};
pub use error::RetrievalError;
pub use filename::{encode_content_disposition, parse_content_disposition, resolve_filename};
pub use metadata::{
    FileDescriptor, candidate_order, extract_descriptor, looks_like_descriptor_payload,
    resolve_descriptor,
};
pub use session::{PrimingOutcome, PrimingReport, SessionContext};
