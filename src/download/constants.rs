//! Constants for the retrieval flow (origin endpoints, defaults).

use std::time::Duration;

/// Default origin base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.data.go.kr";

/// Default per-call request timeout (30 seconds).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout (10 seconds).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound of the candidate file sequence range `[1, DEFAULT_MAX_CANDIDATES]`.
pub const DEFAULT_MAX_CANDIDATES: u32 = 12;

/// Candidate tried first when the caller supplies none.
pub const DEFAULT_CANDIDATE_SEQUENCE: u32 = 1;

/// Content type used when the origin omits or garbles the header.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Prefix of the synthesized filename when nothing better is known.
pub const FALLBACK_FILENAME_PREFIX: &str = "downloaded-file-";

/// Detail page path suffix, appended after `/data/<id>/`.
pub(crate) const DETAIL_PAGE_FILE: &str = "fileData.do";

/// Query string the portal's own links put on the detail page.
pub(crate) const DETAIL_PAGE_QUERY: &str = "recommendDataYn=Y";

/// Secondary priming endpoint.
pub(crate) const CHECK_FILE_TYPE_PATH: &str = "/tcs/dss/checkFileType.do";

/// Metadata probe endpoint.
pub(crate) const METADATA_PATH: &str = "/tcs/dss/selectFileDataDownload.do";

/// Direct download endpoint.
pub(crate) const DIRECT_DOWNLOAD_PATH: &str = "/cmm/cmm/fileDownload.do";

/// Field name the metadata pre-filter looks for.
pub(crate) const ATTACHMENT_ID_FIELD: &str = "atchFileId";
