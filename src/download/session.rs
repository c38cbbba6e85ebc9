//! Per-retrieval session: cookie jar, HTTP client, and referer.
//!
//! The origin's metadata and download endpoints only answer requests that
//! carry the cookies set by the dataset's detail page and a matching
//! `Referer`. A [`SessionContext`] owns a fresh jar for exactly one retrieval
//! and is dropped with it.

use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, Response, redirect};
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CHECK_FILE_TYPE_PATH, DETAIL_PAGE_FILE, DETAIL_PAGE_QUERY};
use super::error::RetrievalError;
use crate::config::OriginConfig;

const MAX_REDIRECTS: usize = 5;

/// Result of a best-effort priming call.
///
/// Priming never fails the retrieval: some origin configurations do not need
/// it, and when one does the metadata probes fail instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimingOutcome {
    /// The origin answered; cookies it set are now in the session jar.
    Primed {
        /// HTTP status of the priming response.
        status: u16,
    },
    /// The request did not complete; the flow continues without it.
    Skipped {
        /// Why the call did not complete.
        reason: String,
    },
}

impl PrimingOutcome {
    /// True when the origin answered with a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Primed { status } if (200..300).contains(status))
    }
}

/// Outcome of both priming calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimingReport {
    /// The dataset detail page request.
    pub detail_page: PrimingOutcome,
    /// The `checkFileType.do` request.
    pub check_file_type: PrimingOutcome,
}

/// Cookie-bound HTTP state for one retrieval.
#[derive(Debug)]
pub struct SessionContext {
    client: Client,
    cookie_jar: Arc<Jar>,
    base_url: Url,
    referer: Url,
    public_data_id: String,
}

impl SessionContext {
    /// Creates a session with a new, empty cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidUrl`] when the referer cannot be built
    /// from the configured base URL, [`RetrievalError::InvalidConfig`] for
    /// header values that are not valid HTTP, or
    /// [`RetrievalError::ClientBuild`] if reqwest rejects the configuration.
    pub fn new(config: &OriginConfig, public_data_id: &str) -> Result<Self, RetrievalError> {
        let referer = detail_page_url(&config.base_url, public_data_id)?;
        let cookie_jar = Arc::new(Jar::default());
        let client = build_session_client(config, Arc::clone(&cookie_jar))?;
        debug!(referer = %referer, "session created");

        Ok(Self {
            client,
            cookie_jar,
            base_url: config.base_url.clone(),
            referer,
            public_data_id: public_data_id.to_string(),
        })
    }

    /// The public data id this session serves.
    #[must_use]
    pub fn public_data_id(&self) -> &str {
        &self.public_data_id
    }

    /// The detail page URL sent as `Referer` on every origin call after priming.
    #[must_use]
    pub fn referer(&self) -> &Url {
        &self.referer
    }

    /// The session's cookie jar. Never shared with another session.
    #[must_use]
    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.cookie_jar
    }

    /// Builds `<base_url><path>?<query>` for an origin endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidUrl`] if the base URL cannot carry a path.
    pub fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, RetrievalError> {
        endpoint_url(&self.base_url, path, query)
    }

    /// Seeds the cookie jar: detail page first, then `checkFileType.do`.
    ///
    /// Both calls are best-effort; see [`PrimingOutcome`].
    #[instrument(skip(self), fields(public_data_id = %self.public_data_id))]
    pub async fn prime(&self) -> PrimingReport {
        let detail_page = self
            .prime_one(self.referer.clone(), self.origin_root(), false)
            .await;

        let check_file_type = match self.endpoint(
            CHECK_FILE_TYPE_PATH,
            &[("publicDataPk", self.public_data_id.as_str())],
        ) {
            Ok(url) => self.prime_one(url, self.referer.to_string(), true).await,
            Err(e) => PrimingOutcome::Skipped {
                reason: e.to_string(),
            },
        };

        PrimingReport {
            detail_page,
            check_file_type,
        }
    }

    /// GET with the session referer, as the portal's page scripts issue it.
    ///
    /// Non-2xx statuses are returned, not raised.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the request cannot be completed.
    pub async fn get_xhr(&self, url: &Url) -> Result<Response, RetrievalError> {
        self.client
            .get(url.clone())
            .header(REFERER, self.referer.as_str())
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .map_err(|e| RetrievalError::transport(url.as_str(), e))
    }

    /// GET with the session referer, as a browser navigation issues it.
    ///
    /// Non-2xx statuses are returned, not raised.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the request cannot be completed.
    pub async fn get_with_referer(&self, url: &Url) -> Result<Response, RetrievalError> {
        self.client
            .get(url.clone())
            .header(REFERER, self.referer.as_str())
            .send()
            .await
            .map_err(|e| RetrievalError::transport(url.as_str(), e))
    }

    async fn prime_one(&self, url: Url, referer: String, xhr: bool) -> PrimingOutcome {
        let mut request = self.client.get(url.clone()).header(REFERER, referer);
        if xhr {
            request = request.header("X-Requested-With", "XMLHttpRequest");
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    debug!(url = %url, status = status.as_u16(), "primed");
                } else {
                    warn!(url = %url, status = status.as_u16(), "priming returned non-success status, continuing");
                }
                PrimingOutcome::Primed {
                    status: status.as_u16(),
                }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "priming request failed, continuing");
                PrimingOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn origin_root(&self) -> String {
        let mut root = self.base_url.clone();
        root.set_query(None);
        root.set_fragment(None);
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        root.to_string()
    }
}

/// `<base_url>/data/<id>/fileData.do?recommendDataYn=Y`, with `id` percent-encoded as a path segment.
pub(crate) fn detail_page_url(base_url: &Url, public_data_id: &str) -> Result<Url, RetrievalError> {
    let mut url = base_url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| RetrievalError::invalid_url(base_url.as_str()))?
        .pop_if_empty()
        .push("data")
        .push(public_data_id)
        .push(DETAIL_PAGE_FILE);
    url.set_query(Some(DETAIL_PAGE_QUERY));
    Ok(url)
}

pub(crate) fn endpoint_url(
    base_url: &Url,
    path: &str,
    query: &[(&str, &str)],
) -> Result<Url, RetrievalError> {
    if base_url.cannot_be_a_base() {
        return Err(RetrievalError::invalid_url(base_url.as_str()));
    }
    let mut url = base_url.clone();
    url.set_fragment(None);
    url.set_query(None);
    let joined = format!("{}{}", base_url.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter().copied());
    }
    Ok(url)
}

fn build_session_client(
    config: &OriginConfig,
    cookie_jar: Arc<Jar>,
) -> Result<Client, RetrievalError> {
    let mut headers = HeaderMap::new();
    let accept_language = HeaderValue::from_str(&config.accept_language).map_err(|_| {
        RetrievalError::invalid_config(format!(
            "accept_language is not a valid header value: {:?}",
            config.accept_language
        ))
    })?;
    headers.insert(ACCEPT_LANGUAGE, accept_language);

    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .cookie_provider(cookie_jar)
        .build()
        .map_err(|source| RetrievalError::ClientBuild { source })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_page_url_shape() {
        let base = Url::parse("https://www.data.go.kr").unwrap();
        let url = detail_page_url(&base, "3074462").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.data.go.kr/data/3074462/fileData.do?recommendDataYn=Y"
        );
    }

    #[test]
    fn test_detail_page_url_encodes_id_as_single_segment() {
        let base = Url::parse("https://www.data.go.kr/").unwrap();
        let url = detail_page_url(&base, "a/b c").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.data.go.kr/data/a%2Fb%20c/fileData.do?recommendDataYn=Y"
        );
    }

    #[test]
    fn test_detail_page_url_keeps_base_path_prefix() {
        let base = Url::parse("http://127.0.0.1:8080/portal/").unwrap();
        let url = detail_page_url(&base, "1").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8080/portal/data/1/fileData.do?recommendDataYn=Y"
        );
    }

    #[test]
    fn test_endpoint_url_appends_path_and_query() {
        let base = Url::parse("https://www.data.go.kr").unwrap();
        let url = endpoint_url(
            &base,
            "/tcs/dss/selectFileDataDownload.do",
            &[("publicDataPk", "3074462"), ("fileDetailSn", "2")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.data.go.kr/tcs/dss/selectFileDataDownload.do?publicDataPk=3074462&fileDetailSn=2"
        );
    }

    #[test]
    fn test_endpoint_url_with_prefix_and_no_query() {
        let base = Url::parse("http://localhost:9000/portal").unwrap();
        let url = endpoint_url(&base, "/cmm/cmm/fileDownload.do", &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/portal/cmm/cmm/fileDownload.do"
        );
    }

    #[test]
    fn test_endpoint_url_rejects_non_base() {
        let base = Url::parse("mailto:someone@example.com").unwrap();
        assert!(matches!(
            endpoint_url(&base, "/x", &[]),
            Err(RetrievalError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_each_session_gets_its_own_cookie_jar() {
        let config = OriginConfig::default();
        let first = SessionContext::new(&config, "3074462").unwrap();
        let second = SessionContext::new(&config, "15012345").unwrap();
        assert!(!Arc::ptr_eq(first.cookie_jar(), second.cookie_jar()));

        let same_id = SessionContext::new(&config, "3074462").unwrap();
        assert!(!Arc::ptr_eq(first.cookie_jar(), same_id.cookie_jar()));
    }

    #[test]
    fn test_session_rejects_invalid_accept_language() {
        let config = OriginConfig {
            accept_language: "ko\nen".to_string(),
            ..OriginConfig::default()
        };
        assert!(matches!(
            SessionContext::new(&config, "1"),
            Err(RetrievalError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_origin_root_has_trailing_slash() {
        let config = OriginConfig::with_base_url("http://localhost:9000/portal").unwrap();
        let session = SessionContext::new(&config, "1").unwrap();
        assert_eq!(session.origin_root(), "http://localhost:9000/portal/");
    }

    #[test]
    fn test_priming_outcome_success_only_for_2xx() {
        assert!(PrimingOutcome::Primed { status: 200 }.is_success());
        assert!(!PrimingOutcome::Primed { status: 500 }.is_success());
        assert!(
            !PrimingOutcome::Skipped {
                reason: "dns".to_string()
            }
            .is_success()
        );
    }

    #[tokio::test]
    async fn test_prime_reports_each_call() {
        use crate::test_support::mock_origin::start_mock_origin;
        use wiremock::matchers::{header, method, path, query_param};
        use wiremock::{Mock, ResponseTemplate};

        let Some(server) = start_mock_origin().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/data/3074462/fileData.do"))
            .and(header("referer", format!("{}/", server.uri()).as_str()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CHECK_FILE_TYPE_PATH))
            .and(query_param("publicDataPk", "3074462"))
            .and(header("x-requested-with", "XMLHttpRequest"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let config = OriginConfig::with_base_url(&server.uri()).unwrap();
        let session = SessionContext::new(&config, "3074462").unwrap();
        let report = session.prime().await;

        assert_eq!(report.detail_page, PrimingOutcome::Primed { status: 200 });
        assert_eq!(report.check_file_type, PrimingOutcome::Primed { status: 503 });
        server.verify().await;
    }

    #[tokio::test]
    async fn test_prime_unreachable_origin_is_skipped_not_failed() {
        let config = OriginConfig::with_base_url("http://127.0.0.1:9").unwrap();
        let session = SessionContext::new(&config, "3074462").unwrap();
        let report = session.prime().await;

        assert!(matches!(report.detail_page, PrimingOutcome::Skipped { .. }));
        assert!(matches!(report.check_file_type, PrimingOutcome::Skipped { .. }));
    }
}

