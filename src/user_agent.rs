//! Shared header defaults for origin traffic.
//!
//! The portal serves its download endpoints to browsers; every call in a
//! retrieval sends the same User-Agent and Accept-Language so the session
//! looks like one visitor.

/// Browser User-Agent sent to the origin.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";

/// Accept-Language sent to the origin (Korean first, English fallback).
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "ko,en;q=0.9";

/// Identity string for the tool's own logs and the serve banner.
#[must_use]
pub fn tool_identity() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("oda-fetch/{version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_user_agent_looks_like_chrome() {
        assert!(BROWSER_USER_AGENT.starts_with("Mozilla/5.0"));
        assert!(BROWSER_USER_AGENT.contains("Chrome/"));
        assert!(
            !BROWSER_USER_AGENT.contains("  "),
            "line continuation must not leave double spaces: {BROWSER_USER_AGENT}"
        );
    }

    #[test]
    fn test_tool_identity_contains_crate_version() {
        let identity = tool_identity();
        assert_eq!(
            identity.strip_prefix("oda-fetch/"),
            Some(env!("CARGO_PKG_VERSION"))
        );
    }
}
