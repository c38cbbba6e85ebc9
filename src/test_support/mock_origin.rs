//! A wiremock stand-in for the portal, shared by unit and integration tests.
//!
//! Compiled into the library under `cfg(test)` and into the integration test
//! crates through `tests/support`, so it only depends on `wiremock` and
//! `serde_json`.

use std::net::TcpListener;
use std::panic::Location;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REQUIRE_ENV: &str = "ODA_FETCH_REQUIRE_SOCKET_TESTS";

pub const METADATA_PATH: &str = "/tcs/dss/selectFileDataDownload.do";
pub const DOWNLOAD_PATH: &str = "/cmm/cmm/fileDownload.do";
pub const CHECK_FILE_TYPE_PATH: &str = "/tcs/dss/checkFileType.do";

/// What the portal serves for an unknown candidate: 200 + an HTML page.
pub const ERROR_PAGE: &str = "<html><body>요청하신 페이지를 찾을 수 없습니다</body></html>";

fn mock_origin_required() -> bool {
    std::env::var(REQUIRE_ENV)
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Starts a mock origin, or returns `None` when localhost cannot be bound.
///
/// With `ODA_FETCH_REQUIRE_SOCKET_TESTS=1` a missing loopback fails the test instead.
#[track_caller]
pub fn start_mock_origin() -> impl Future<Output = Option<MockServer>> {
    let caller = Location::caller();
    let available = TcpListener::bind("127.0.0.1:0").is_ok();
    if !available {
        let message = format!(
            "mock origin unavailable at {}:{}: cannot bind a localhost socket",
            caller.file(),
            caller.line()
        );
        assert!(!mock_origin_required(), "{message}. Unset {REQUIRE_ENV} to skip instead.");
        eprintln!("{message}. Skipping; set {REQUIRE_ENV}=1 to fail instead.");
    }
    async move {
        if available {
            Some(MockServer::start().await)
        } else {
            None
        }
    }
}

/// Detail page and `checkFileType.do` both answer 200 for `public_data_id`.
pub async fn mount_priming(server: &MockServer, public_data_id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/data/{public_data_id}/fileData.do")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>detail</html>"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(CHECK_FILE_TYPE_PATH))
        .and(query_param("publicDataPk", public_data_id))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": "ok" })),
        )
        .mount(server)
        .await;
}

/// Every metadata probe not matched by [`mount_metadata_hit`] gets the error page.
pub async fn mount_metadata_misses(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(METADATA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ERROR_PAGE, "text/html"))
        .with_priority(10)
        .mount(server)
        .await;
}

/// Answers the probe for `candidate` with `body`.
pub async fn mount_metadata_hit(
    server: &MockServer,
    public_data_id: &str,
    candidate: u32,
    body: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path(METADATA_PATH))
        .and(query_param("publicDataPk", public_data_id))
        .and(query_param("fileDetailSn", candidate.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .with_priority(1)
        .mount(server)
        .await;
}

/// Answers the direct download of `attachment_id` / `file_sn` with `response`.
pub async fn mount_download(
    server: &MockServer,
    attachment_id: &str,
    file_sn: u32,
    response: ResponseTemplate,
) {
    Mock::given(method("GET"))
        .and(path(DOWNLOAD_PATH))
        .and(query_param("atchFileId", attachment_id))
        .and(query_param("fileSn", file_sn.to_string()))
        .respond_with(response)
        .mount(server)
        .await;
}
