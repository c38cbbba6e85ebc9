//! Filename derivation for retrieved payloads.
//!
//! Priority: the descriptor's declared name, then `Content-Disposition`
//! (RFC 5987 extended form before the plain form), then a synthesized
//! `downloaded-file-<id>` name. The result is never empty.

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::constants::FALLBACK_FILENAME_PREFIX;

static EXTENDED_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#"(?i)filename\*\s*=\s*"?([^';"]*)'([^']*)'([^;]+)"#)
        .expect("extended filename pattern is valid")
});

static QUOTED_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#"(?i)filename\s*=\s*"([^"]+)""#).expect("quoted filename pattern is valid")
});

static BARE_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)filename\s*=\s*([^;]+)").expect("bare filename pattern is valid")
});

/// Picks the filename for a retrieval result.
///
/// `declared_name` wins when it has non-whitespace content; otherwise the
/// `Content-Disposition` header is parsed; otherwise the synthesized fallback
/// is returned.
#[must_use]
pub fn resolve_filename(
    declared_name: Option<&str>,
    content_disposition: Option<&str>,
    public_data_id: &str,
) -> String {
    if let Some(name) = declared_name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    if let Some(name) = content_disposition.and_then(parse_content_disposition) {
        return name;
    }

    debug!(public_data_id, "no usable filename from origin, using fallback");
    fallback_filename(public_data_id)
}

/// The synthesized name used when the origin gives nothing usable.
#[must_use]
pub fn fallback_filename(public_data_id: &str) -> String {
    format!("{FALLBACK_FILENAME_PREFIX}{public_data_id}")
}

/// Parses a Content-Disposition header value to extract a filename.
///
/// Handles:
/// - `attachment; filename*=UTF-8''%EC%83%81%EA%B0%80.csv` (RFC 5987, preferred)
/// - `attachment; filename="example.csv"`
/// - `attachment; filename=example.csv`
///
/// Parameter names are matched case-insensitively. A percent-encoded value
/// that does not decode to UTF-8 falls through to the plain form.
#[must_use]
pub fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(caps) = EXTENDED_FILENAME.captures(header) {
        let encoded = caps[3].trim().trim_matches('"');
        match urlencoding::decode(encoded) {
            Ok(decoded) if !decoded.trim().is_empty() => return Some(decoded.into_owned()),
            Ok(_) => {}
            Err(e) => debug!(value = %encoded, error = %e, "filename* did not decode as UTF-8"),
        }
    }

    let plain = QUOTED_FILENAME
        .captures(header)
        .or_else(|| BARE_FILENAME.captures(header))?;
    let name = plain[1].trim().trim_matches('"').trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Builds the outbound header value `attachment; filename*=UTF-8''<percent-encoded>`.
///
/// [`parse_content_disposition`] returns `name` unchanged for any value this produces.
#[must_use]
pub fn encode_content_disposition(name: &str) -> String {
    format!("attachment; filename*=UTF-8''{}", urlencoding::encode(name))
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
