//! Direct download: resolved descriptor to raw bytes.

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderName};
use tracing::{debug, instrument, warn};

use super::constants::{DEFAULT_CONTENT_TYPE, DIRECT_DOWNLOAD_PATH};
use super::error::RetrievalError;
use super::metadata::FileDescriptor;
use super::session::SessionContext;

/// Raw response of the download endpoint.
#[derive(Debug, Clone)]
pub struct DirectPayload {
    /// Response body, untouched.
    pub bytes: Vec<u8>,
    /// Lower-cased `Content-Type`, or `application/octet-stream`.
    pub content_type: String,
    /// Raw `Content-Disposition` header, if present and valid UTF-8.
    pub content_disposition: Option<String>,
    /// HTTP status of the download response.
    pub status: u16,
}

/// Fetches the file bytes for `descriptor`.
///
/// The response status is not validated: the origin reports some failures
/// as 200 + HTML and some successes with odd statuses, so any non-empty
/// payload is returned as-is. When `reject_html` is set, a `text/html` payload is
/// treated as an origin error page.
///
/// # Errors
///
/// Returns a transport error if the request or body read fails,
/// [`RetrievalError::OriginErrorPage`] for a rejected HTML payload, or
/// [`RetrievalError::EmptyPayload`] when the response has no body.
#[instrument(skip(session, descriptor), fields(
    public_data_id = %session.public_data_id(),
    attachment_id = %descriptor.attachment_id,
    file_sequence = descriptor.file_sequence,
))]
pub async fn fetch_payload(
    session: &SessionContext,
    descriptor: &FileDescriptor,
    reject_html: bool,
) -> Result<DirectPayload, RetrievalError> {
    let file_sequence = descriptor.file_sequence.to_string();
    let url = session.endpoint(
        DIRECT_DOWNLOAD_PATH,
        &[
            ("atchFileId", descriptor.attachment_id.as_str()),
            ("fileSn", file_sequence.as_str()),
        ],
    )?;
    debug!(url = %url, "direct download");

    let response = session.get_with_referer(&url).await?;
    let status = response.status();
    if !status.is_success() {
        warn!(url = %url, status = status.as_u16(), "download endpoint returned non-success status");
    }

    let content_type = normalized_content_type(response.headers());
    let content_disposition = header_text(response.headers(), &CONTENT_DISPOSITION);

    if reject_html && is_html(&content_type) {
        return Err(RetrievalError::origin_error_page(url.as_str(), content_type));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| RetrievalError::transport(url.as_str(), e))?;

    if bytes.is_empty() {
        return Err(RetrievalError::empty_payload(url.as_str(), status.as_u16()));
    }

    Ok(DirectPayload {
        bytes: bytes.to_vec(),
        content_type,
        content_disposition,
        status: status.as_u16(),
    })
}

/// Lower-cased `Content-Type`, or the octet-stream default when missing, blank, or not visible ASCII.
#[must_use]
pub fn normalized_content_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| DEFAULT_CONTENT_TYPE.to_string(), str::to_ascii_lowercase)
}

/// Header value as text; raw UTF-8 bytes are kept, anything else is dropped.
fn header_text(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    let value = headers.get(name)?;
    std::str::from_utf8(value.as_bytes())
        .ok()
        .map(str::to_string)
}

fn is_html(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim() == "text/html")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers_with(content_type: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_bytes(content_type).unwrap());
        headers
    }

    #[test]
    fn test_normalized_content_type_lowercases() {
        assert_eq!(
            normalized_content_type(&headers_with(b"Text/CSV; Charset=UTF-8")),
            "text/csv; charset=utf-8"
        );
    }

    #[test]
    fn test_normalized_content_type_missing_defaults() {
        assert_eq!(
            normalized_content_type(&HeaderMap::new()),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_normalized_content_type_blank_defaults() {
        assert_eq!(
            normalized_content_type(&headers_with(b"   ")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_normalized_content_type_non_ascii_defaults() {
        assert_eq!(
            normalized_content_type(&headers_with(&[0xEC, 0x83, 0x81])),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_is_html_ignores_parameters() {
        assert!(is_html("text/html"));
        assert!(is_html("text/html;charset=utf-8"));
        assert!(!is_html("text/csv"));
        assert!(!is_html("application/xhtml+xml"));
        assert!(!is_html("application/octet-stream"));
    }

    #[test]
    fn test_header_text_keeps_raw_utf8_disposition() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_bytes("attachment; filename=\"상가.csv\"".as_bytes()).unwrap(),
        );
        assert_eq!(
            header_text(&headers, &CONTENT_DISPOSITION).as_deref(),
            Some("attachment; filename=\"상가.csv\"")
        );
    }

    #[test]
    fn test_header_text_drops_invalid_utf8() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_bytes(b"attachment; filename=\"\xff.csv\"").unwrap(),
        );
        assert_eq!(header_text(&headers, &CONTENT_DISPOSITION), None);
        assert_eq!(header_text(&HeaderMap::new(), &CONTENT_DISPOSITION), None);
    }
}
