//! HTTP front for the retrieval core.
//!
//! `GET /api/download-by-pk/:public_data_pk[?fileDetailSn=N]` runs a buffered
//! retrieval and streams the bytes back with an RFC 5987 filename and
//! cache-disabling headers. Failures become a JSON error envelope; a failed
//! retrieval never produces a 200.

mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, EXPIRES, PRAGMA};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::info;

pub use error::{ErrorBody, HttpError};

use crate::download::{RetrievalClient, RetrievalResult, encode_content_disposition};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    client: Arc<RetrievalClient>,
}

impl AppState {
    /// Wraps a retrieval client for use by handlers.
    #[must_use]
    pub fn new(client: RetrievalClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

/// Query string of the download route.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Candidate file sequence to probe first.
    #[serde(rename = "fileDetailSn")]
    pub file_detail_sn: Option<u32>,
}

/// Builds the router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/download-by-pk/:public_data_pk", get(download_by_pk))
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(client: RetrievalClient, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local = listener.local_addr().unwrap_or(addr);
    info!(addr = %local, identity = %crate::user_agent::tool_identity(), "listening");

    axum::serve(listener, create_router(AppState::new(client)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

async fn health() -> &'static str {
    "OK"
}

/// Retrieves the file for `public_data_pk` and returns its bytes.
async fn download_by_pk(
    State(state): State<AppState>,
    Path(public_data_pk): Path<String>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, HttpError> {
    let Query(query) = query.map_err(|e| HttpError::BadRequest(e.body_text()))?;
    if public_data_pk.trim().is_empty() {
        return Err(HttpError::BadRequest(
            "publicDataPk must not be blank".to_string(),
        ));
    }

    info!(public_data_pk = %public_data_pk, file_detail_sn = ?query.file_detail_sn, "download requested");
    let result = state
        .client
        .retrieve_to_buffer(&public_data_pk, query.file_detail_sn)
        .await?;
    file_response(result)
}

/// Shapes a retrieval result into the attachment response.
fn file_response(result: RetrievalResult) -> Result<Response, HttpError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, result.content_type.as_str())
        .header(
            CONTENT_DISPOSITION,
            encode_content_disposition(&result.file_name),
        )
        .header(CONTENT_LENGTH, result.bytes.len())
        .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(PRAGMA, "no-cache")
        .header(EXPIRES, "0")
        .body(Body::from(result.bytes))
        .map_err(|e| HttpError::Internal(e.to_string()))
}
