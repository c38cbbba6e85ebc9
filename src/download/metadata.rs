//! Metadata resolution: candidate file sequences to a [`FileDescriptor`].
//!
//! The origin has no lookup from a public data id to its attachment, so the
//! resolver probes `selectFileDataDownload.do` for each candidate file
//! sequence in `[1, max_candidates]` (preferred candidate first) and takes the
//! first response that yields an attachment id.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::constants::{ATTACHMENT_ID_FIELD, METADATA_PATH};
use super::error::RetrievalError;
use super::session::SessionContext;

/// Top-level object of the metadata response.
const TOP_LEVEL: Option<&str> = None;
/// Nested registration record.
const REGISTRATION: Option<&str> = Some("fileDataRegistVO");
/// Nested dataset file detail record.
const DETAIL: Option<&str> = Some("dataSetFileDetailInfo");

/// Where each logical field may live, in priority order.
const LOCATIONS: [Option<&str>; 3] = [TOP_LEVEL, REGISTRATION, DETAIL];

const FILE_SEQUENCE_FIELD: &str = "fileDetailSn";
const DECLARED_NAME_FIELD: &str = "orginlFileNm";
const GROUP_ID_FIELD: &str = "publicDataDetailPk";

/// Everything the direct downloader needs to fetch one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    /// Origin attachment group id (`atchFileId`).
    pub attachment_id: String,
    /// File sequence within the attachment (`fileSn` on the download endpoint).
    pub file_sequence: u32,
    /// Original filename as registered on the portal.
    pub declared_name: Option<String>,
    /// Dataset detail key, when the origin reports one.
    pub group_id: Option<String>,
}

/// Cheap guard run before JSON parsing.
///
/// The origin answers unknown candidates with HTML error pages under a 200
/// status; only bodies that open a JSON object and mention the attachment id
/// field are worth parsing.
#[must_use]
pub fn looks_like_descriptor_payload(body: &str) -> bool {
    body.trim_start().starts_with('{') && body.contains(ATTACHMENT_ID_FIELD)
}

/// Extracts a descriptor from a parsed metadata response.
///
/// Each field is looked up at the top level, then under `fileDataRegistVO`,
/// then under `dataSetFileDetailInfo`; the first non-empty value wins. The file
/// sequence defaults to `candidate` when absent or unparseable. Returns `None`
/// when no attachment id is present anywhere.
#[must_use]
pub fn extract_descriptor(json: &Value, candidate: u32) -> Option<FileDescriptor> {
    let attachment_id = first_string(json, ATTACHMENT_ID_FIELD)?;
    let file_sequence = LOCATIONS
        .iter()
        .filter_map(|location| field_at(json, *location, FILE_SEQUENCE_FIELD))
        .find_map(value_as_sequence)
        .unwrap_or(candidate);

    Some(FileDescriptor {
        attachment_id,
        file_sequence,
        declared_name: first_string(json, DECLARED_NAME_FIELD),
        group_id: first_string(json, GROUP_ID_FIELD),
    })
}

/// Parses a raw probe body, returning `None` for anything that is not a usable descriptor.
#[must_use]
pub fn parse_probe_body(body: &str, candidate: u32) -> Option<FileDescriptor> {
    if !looks_like_descriptor_payload(body) {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(json) => extract_descriptor(&json, candidate),
        Err(e) => {
            debug!(candidate, error = %e, "metadata body failed to parse as JSON");
            None
        }
    }
}

/// Order in which candidates are probed: `preferred` first, then `1..=max` ascending without it.
#[must_use]
pub fn candidate_order(preferred: u32, max_candidates: u32) -> Vec<u32> {
    std::iter::once(preferred)
        .chain((1..=max_candidates).filter(move |sn| *sn != preferred))
        .collect()
}

/// Probes candidates serially until one yields a descriptor.
///
/// Non-matching bodies (HTML, malformed JSON, JSON without an attachment id)
/// move the scan on; transport failures abort it.
///
/// # Errors
///
/// Returns [`RetrievalError::DescriptorNotFound`] when every candidate misses,
/// or a transport error from the first probe that fails on the wire.
#[instrument(skip(session), fields(public_data_id = %session.public_data_id()))]
pub async fn resolve_descriptor(
    session: &SessionContext,
    preferred: u32,
    max_candidates: u32,
) -> Result<FileDescriptor, RetrievalError> {
    let order = candidate_order(preferred, max_candidates);
    for (probed, candidate) in order.iter().copied().enumerate() {
        if let Some(descriptor) = probe_candidate(session, candidate).await? {
            info!(
                candidate,
                probes = probed + 1,
                attachment_id = %descriptor.attachment_id,
                file_sequence = descriptor.file_sequence,
                declared_name = descriptor.declared_name.as_deref().unwrap_or("-"),
                group_id = descriptor.group_id.as_deref().unwrap_or("-"),
                "resolved file descriptor"
            );
            return Ok(descriptor);
        }
    }

    Err(RetrievalError::descriptor_not_found(
        session.public_data_id(),
        order.len(),
    ))
}

async fn probe_candidate(
    session: &SessionContext,
    candidate: u32,
) -> Result<Option<FileDescriptor>, RetrievalError> {
    let candidate_str = candidate.to_string();
    let url = session.endpoint(
        METADATA_PATH,
        &[
            ("publicDataPk", session.public_data_id()),
            ("fileDetailSn", &candidate_str),
        ],
    )?;

    let response = session.get_xhr(&url).await?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| RetrievalError::transport(url.as_str(), e))?;

    let descriptor = parse_probe_body(&body, candidate);
    debug!(
        candidate,
        status = status.as_u16(),
        bytes = body.len(),
        matched = descriptor.is_some(),
        "metadata probe"
    );
    Ok(descriptor)
}

fn field_at<'a>(json: &'a Value, location: Option<&str>, field: &str) -> Option<&'a Value> {
    let scope = match location {
        Some(key) => json.get(key)?,
        None => json,
    };
    scope.get(field)
}

fn first_string(json: &Value, field: &str) -> Option<String> {
    LOCATIONS
        .iter()
        .filter_map(|location| field_at(json, *location, field))
        .find_map(value_as_text)
}

fn value_as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn value_as_sequence(value: &Value) -> Option<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.filter(|sn| *sn > 0)
}
