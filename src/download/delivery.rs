//! Delivery adapters: hand a retrieved payload to the caller in memory or on disk.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use super::client::RetrievalResult;
use super::error::RetrievalError;
use super::filename::sanitize_filename;

/// How the caller wants the payload delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Return the bytes in memory (for streaming to an HTTP client).
    Buffer,
    /// Persist the bytes under a directory derived from `save_path`.
    Disk {
        /// Target directory, or a file path whose parent is the target directory.
        save_path: PathBuf,
    },
}

/// A payload persisted to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedFile {
    /// Absolute path of the written file.
    pub path: PathBuf,
    /// Resolved filename (before filesystem sanitization).
    pub file_name: String,
    /// Content type reported by the origin.
    pub content_type: String,
    /// Number of bytes written.
    pub bytes_written: u64,
}

/// What a retrieval hands back, depending on [`DeliveryMode`].
#[derive(Debug, Clone)]
pub enum Delivery {
    /// In-memory payload.
    Buffered(RetrievalResult),
    /// Payload written to disk.
    Saved(SavedFile),
}

impl Delivery {
    /// Resolved filename, whichever way the payload was delivered.
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Buffered(result) => &result.file_name,
            Self::Saved(saved) => &saved.file_name,
        }
    }

    /// Content type, whichever way the payload was delivered.
    #[must_use]
    pub fn content_type(&self) -> &str {
        match self {
            Self::Buffered(result) => &result.content_type,
            Self::Saved(saved) => &saved.content_type,
        }
    }
}

/// Writes `result` to `<dir>/<sanitized file name>`, creating `<dir>` as needed.
///
/// `<dir>` is `save_path` itself when it is an existing directory or ends in a
/// path separator, otherwise its parent (the current directory when there is
/// none). An existing file with the same name is overwritten.
///
/// # Errors
///
/// Returns [`RetrievalError::Io`] when the directory cannot be created or the
/// file cannot be written.
#[instrument(skip(result), fields(file_name = %result.file_name, bytes = result.bytes.len()))]
pub async fn save_to_disk(
    result: &RetrievalResult,
    save_path: &Path,
) -> Result<SavedFile, RetrievalError> {
    let dir = target_dir(save_path).await;
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| RetrievalError::io(dir.clone(), e))?;

    let file_path = dir.join(sanitize_filename(&result.file_name));
    debug!(path = %file_path.display(), "writing payload");
    tokio::fs::write(&file_path, &result.bytes)
        .await
        .map_err(|e| RetrievalError::io(file_path.clone(), e))?;

    let path = tokio::fs::canonicalize(&file_path)
        .await
        .map_err(|e| RetrievalError::io(file_path.clone(), e))?;

    info!(path = %path.display(), bytes = result.bytes.len(), "payload saved");
    Ok(SavedFile {
        path,
        file_name: result.file_name.clone(),
        content_type: result.content_type.clone(),
        bytes_written: result.bytes.len() as u64,
    })
}

async fn target_dir(save_path: &Path) -> PathBuf {
    let raw = save_path.as_os_str().to_string_lossy();
    let names_directory = raw.ends_with('/') || raw.ends_with(MAIN_SEPARATOR);
    let is_existing_dir = tokio::fs::metadata(save_path)
        .await
        .is_ok_and(|meta| meta.is_dir());

    if names_directory || is_existing_dir {
        return save_path.to_path_buf();
    }

    match save_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_result(file_name: &str) -> RetrievalResult {
        RetrievalResult {
            bytes: "id,name\n1,상가\n".as_bytes().to_vec(),
            file_name: file_name.to_string(),
            content_type: "text/csv".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_to_disk_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = sample_result("상가업소정보.csv");

        let saved = save_to_disk(&result, temp_dir.path()).await.unwrap();

        assert!(saved.path.is_absolute());
        assert_eq!(saved.path.file_name().unwrap(), "상가업소정보.csv");
        assert_eq!(std::fs::read(&saved.path).unwrap(), result.bytes);
        assert_eq!(saved.bytes_written, result.bytes.len() as u64);
        assert_eq!(saved.content_type, "text/csv");
    }

    #[tokio::test]
    async fn test_save_to_disk_file_path_uses_parent_and_creates_it() {
        let temp_dir = TempDir::new().unwrap();
        let save_path = temp_dir.path().join("nested").join("deeper").join("ignored.bin");

        let saved = save_to_disk(&sample_result("data.csv"), &save_path)
            .await
            .unwrap();

        let expected_dir = std::fs::canonicalize(temp_dir.path())
            .unwrap()
            .join("nested")
            .join("deeper");
        assert_eq!(saved.path, expected_dir.join("data.csv"));
        assert!(!save_path.exists());
    }

    #[tokio::test]
    async fn test_save_to_disk_trailing_separator_names_new_directory() {
        let temp_dir = TempDir::new().unwrap();
        let save_path = PathBuf::from(format!(
            "{}{}out{}",
            temp_dir.path().display(),
            MAIN_SEPARATOR,
            MAIN_SEPARATOR
        ));

        let saved = save_to_disk(&sample_result("data.csv"), &save_path)
            .await
            .unwrap();

        assert_eq!(saved.path.parent().unwrap().file_name().unwrap(), "out");
    }

    #[tokio::test]
    async fn test_save_to_disk_sanitizes_path_like_names() {
        let temp_dir = TempDir::new().unwrap();

        let saved = save_to_disk(&sample_result("../../etc/passwd"), temp_dir.path())
            .await
            .unwrap();

        let base = std::fs::canonicalize(temp_dir.path()).unwrap();
        assert!(saved.path.starts_with(&base), "escaped: {}", saved.path.display());
        assert_eq!(saved.file_name, "../../etc/passwd");
    }

    #[tokio::test]
    async fn test_save_to_disk_overwrites_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("data.csv"), b"old").unwrap();

        let saved = save_to_disk(&sample_result("data.csv"), temp_dir.path())
            .await
            .unwrap();

        assert_ne!(std::fs::read(&saved.path).unwrap(), b"old");
    }

    #[test]
    fn test_delivery_accessors() {
        let delivery = Delivery::Buffered(sample_result("a.csv"));
        assert_eq!(delivery.file_name(), "a.csv");
        assert_eq!(delivery.content_type(), "text/csv");
    }
}
