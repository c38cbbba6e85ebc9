//! Origin configuration and config-file loading.
//!
//! [`OriginConfig`] is injected into [`crate::RetrievalClient`] at construction
//! time. [`FileConfig`] is the optional on-disk layer the CLI merges under its
//! own flags.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use url::Url;

use crate::download::constants::{
    CONNECT_TIMEOUT, DEFAULT_BASE_URL, DEFAULT_MAX_CANDIDATES, REQUEST_TIMEOUT,
};
use crate::download::RetrievalError;
use crate::user_agent::{BROWSER_USER_AGENT, DEFAULT_ACCEPT_LANGUAGE};

/// Default bind address for `oda-fetch serve`.
pub const DEFAULT_BIND: &str = "127.0.0.1:3001";

/// Default output directory for `oda-fetch fetch`.
pub const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Everything the retrieval client needs to know about the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginConfig {
    /// Scheme + host (and optional path prefix) of the portal.
    pub base_url: Url,
    /// Timeout applied to every individual HTTP call.
    pub request_timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header sent on every call.
    pub user_agent: String,
    /// Accept-Language header sent on every call.
    pub accept_language: String,
    /// Upper bound of the candidate file sequence range.
    pub max_candidates: u32,
    /// Fail instead of returning `text/html` bodies from the download endpoint.
    pub reject_html_payload: bool,
}

impl Default for OriginConfig {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            request_timeout: REQUEST_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            user_agent: BROWSER_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            max_candidates: DEFAULT_MAX_CANDIDATES,
            reject_html_payload: true,
        }
    }
}

impl OriginConfig {
    /// Builds a config pointing at `base_url` with every other value defaulted.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidUrl`] when `base_url` does not parse or
    /// cannot carry a path.
    pub fn with_base_url(base_url: &str) -> Result<Self, RetrievalError> {
        let parsed = Url::parse(base_url).map_err(|_| RetrievalError::invalid_url(base_url))?;
        let config = Self {
            base_url: parsed,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants the retrieval flow relies on.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidUrl`] for a base URL that cannot carry
    /// a path, and [`RetrievalError::InvalidConfig`] for an empty candidate
    /// range or a zero timeout.
    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.base_url.cannot_be_a_base() {
            return Err(RetrievalError::invalid_url(self.base_url.as_str()));
        }
        if self.max_candidates == 0 {
            return Err(RetrievalError::invalid_config("max_candidates must be at least 1"));
        }
        if self.request_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(RetrievalError::invalid_config("timeouts must be non-zero"));
        }
        Ok(())
    }

    /// Applies file-config overrides on top of `self`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` in the file does not parse.
    pub fn merged_with(mut self, file: &FileConfig) -> Result<Self> {
        if let Some(base_url) = &file.base_url {
            self.base_url = Url::parse(base_url)
                .with_context(|| format!("Invalid `base_url` in config: {base_url}"))?;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = &file.user_agent {
            self.user_agent.clone_from(user_agent);
        }
        if let Some(accept_language) = &file.accept_language {
            self.accept_language.clone_from(accept_language);
        }
        if let Some(max_candidates) = file.max_candidates {
            self.max_candidates = max_candidates;
        }
        if let Some(reject) = file.reject_html_payload {
            self.reject_html_payload = reject;
        }
        Ok(self)
    }
}

/// TOML-subset file configuration for oda-fetch defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Origin base URL.
    pub base_url: Option<String>,
    /// Per-call request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// User-Agent override.
    pub user_agent: Option<String>,
    /// Accept-Language override.
    pub accept_language: Option<String>,
    /// Candidate range upper bound.
    pub max_candidates: Option<u32>,
    /// Reject HTML download payloads.
    pub reject_html_payload: Option<bool>,
    /// Bind address for `serve`.
    pub bind: Option<SocketAddr>,
    /// Output directory for `fetch`.
    pub output_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("request_timeout_secs", self.request_timeout_secs)?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        if let Some(max) = self.max_candidates
            && !(1..=100).contains(&max)
        {
            bail!("Invalid config value for `max_candidates`: {max}. Expected range: 1..=100");
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/oda-fetch/config.toml`
/// 2. `$HOME/.config/oda-fetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("oda-fetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("oda-fetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file at `explicit`, or the default path if it exists.
///
/// A missing default file is not an error; a missing explicit file is.
///
/// # Errors
///
/// Returns an error when the file cannot be read, parsed, or validated.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match resolve_default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config = parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config file '{}'", path.display()))?;
    Ok(Some(config))
}

/// Parses the `key = value` config format.
///
/// # Errors
///
/// Returns an error with the offending line number on bad syntax, unknown
/// keys, or values of the wrong type.
pub fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "base_url" => {
                cfg.base_url = Some(
                    parse_string_literal(value)
                        .with_context(|| format!("Invalid `base_url` value on line {line_no}"))?,
                );
            }
            "request_timeout_secs" => {
                cfg.request_timeout_secs = Some(parse_integer_u64(value).with_context(|| {
                    format!("Invalid `request_timeout_secs` value on line {line_no}")
                })?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(|| {
                    format!("Invalid `connect_timeout_secs` value on line {line_no}")
                })?);
            }
            "user_agent" => {
                cfg.user_agent = Some(
                    parse_string_literal(value)
                        .with_context(|| format!("Invalid `user_agent` value on line {line_no}"))?,
                );
            }
            "accept_language" => {
                cfg.accept_language = Some(parse_string_literal(value).with_context(|| {
                    format!("Invalid `accept_language` value on line {line_no}")
                })?);
            }
            "max_candidates" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `max_candidates` value on line {line_no}")
                })?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("max_candidates out of range for u32"))?;
                cfg.max_candidates = Some(n);
            }
            "reject_html_payload" => {
                cfg.reject_html_payload = Some(parse_boolean(value).with_context(|| {
                    format!("Invalid `reject_html_payload` value on line {line_no}")
                })?);
            }
            "bind" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `bind` value on line {line_no}"))?;
                cfg.bind = Some(
                    parsed
                        .parse()
                        .with_context(|| format!("Invalid `bind` address on line {line_no}"))?,
                );
            }
            "output_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output_dir` value on line {line_no}"))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            other => bail!("Unknown config key `{other}` on line {line_no}"),
        }
    }
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        match ch {
            '\\' if in_string && !escaped => {
                escaped = true;
                continue;
            }
            '"' if !escaped => in_string = !in_string,
            '#' if !in_string => return &line[..idx],
            _ => {}
        }
        escaped = false;
    }
    line
}

fn parse_string_literal(value: &str) -> Result<String> {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        bail!("expected a double-quoted string");
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => bail!("unsupported escape sequence \\{other}"),
            None => bail!("dangling escape at end of string"),
        }
    }
    Ok(out)
}

fn parse_integer_u64(value: &str) -> Result<u64> {
    value
        .replace('_', "")
        .parse::<u64>()
        .with_context(|| format!("expected a non-negative integer, got `{value}`"))
}

fn parse_boolean(value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => bail!("expected `true` or `false`, got `{other}`"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_origin_config_default_values() {
        let config = OriginConfig::default();
        assert_eq!(config.base_url.as_str(), "https://www.data.go.kr/");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_candidates, 12);
        assert_eq!(config.accept_language, "ko,en;q=0.9");
        assert!(config.reject_html_payload);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_origin_config_rejects_zero_candidates() {
        let config = OriginConfig {
            max_candidates: 0,
            ..OriginConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_origin_config_rejects_non_base_url() {
        assert!(OriginConfig::with_base_url("mailto:ops@example.com").is_err());
        assert!(OriginConfig::with_base_url("not a url").is_err());
    }

    #[test]
    fn test_parse_config_str_reads_all_keys() {
        let raw = r#"
# origin settings
base_url = "http://127.0.0.1:8080"
request_timeout_secs = 45
connect_timeout_secs = 5   # short connect
user_agent = "test-agent \"quoted\""
accept_language = "ko"
max_candidates = 20
reject_html_payload = false
bind = "0.0.0.0:3001"
output_dir = "/tmp/oda"
"#;
        let cfg = parse_config_str(raw).unwrap();
        assert_eq!(cfg.base_url.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(cfg.request_timeout_secs, Some(45));
        assert_eq!(cfg.connect_timeout_secs, Some(5));
        assert_eq!(cfg.user_agent.as_deref(), Some("test-agent \"quoted\""));
        assert_eq!(cfg.accept_language.as_deref(), Some("ko"));
        assert_eq!(cfg.max_candidates, Some(20));
        assert_eq!(cfg.reject_html_payload, Some(false));
        assert_eq!(cfg.bind, Some("0.0.0.0:3001".parse().unwrap()));
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/tmp/oda")));
    }

    #[test]
    fn test_parse_config_str_hash_inside_string_is_kept() {
        let cfg = parse_config_str(r#"user_agent = "agent#1""#).unwrap();
        assert_eq!(cfg.user_agent.as_deref(), Some("agent#1"));
    }

    #[test]
    fn test_parse_config_str_unknown_key_reports_line() {
        let err = parse_config_str("\nconcurrency = 4").unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("concurrency"), "Expected key in: {msg}");
        assert!(msg.contains("line 2"), "Expected line number in: {msg}");
    }

    #[test]
    fn test_parse_config_str_rejects_unquoted_string() {
        assert!(parse_config_str("base_url = http://example.com").is_err());
    }

    #[test]
    fn test_file_config_validate_ranges() {
        let cfg = FileConfig {
            max_candidates: Some(0),
            ..FileConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = FileConfig {
            request_timeout_secs: Some(0),
            ..FileConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = FileConfig {
            request_timeout_secs: Some(60),
            max_candidates: Some(12),
            ..FileConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_merged_with_overrides_only_present_fields() {
        let file = FileConfig {
            base_url: Some("http://localhost:9000".to_string()),
            max_candidates: Some(3),
            ..FileConfig::default()
        };
        let merged = OriginConfig::default().merged_with(&file).unwrap();
        assert_eq!(merged.base_url.as_str(), "http://localhost:9000/");
        assert_eq!(merged.max_candidates, 3);
        assert_eq!(merged.request_timeout, Duration::from_secs(30));
        assert_eq!(merged.user_agent, BROWSER_USER_AGENT);
    }

    #[test]
    fn test_load_file_config_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_candidates = 4\n").unwrap();

        let cfg = load_file_config(Some(&path)).unwrap().unwrap();
        assert_eq!(cfg.max_candidates, Some(4));
    }

    #[test]
    fn test_load_file_config_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(load_file_config(Some(&path)).is_err());
    }

    #[test]
    fn test_load_file_config_explicit_invalid_value_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "request_timeout_secs = 99999\n").unwrap();
        assert!(load_file_config(Some(&path)).is_err());
    }
}
