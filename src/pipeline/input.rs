//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! ## Why download to a temp file?
//!
//! Layout dumps can be large and the JSON reader wants a seekable file.
//! Downloading to a `TempDir` gives us a path to open while ensuring
//! cleanup happens automatically when `ResolvedInput` is dropped, even if
//! the process panics. We sniff the first non-whitespace byte (`{`) before
//! returning so callers get a meaningful error rather than a serde parse
//! failure deep inside the pipeline.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The resolved input — either a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; file downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the layout file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local layout file path.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ConvertError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and the JSON shape.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, ConvertError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(ConvertError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(f) => {
            validate_magic(f, &path)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ConvertError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ConvertError::FileNotFound { path });
        }
    }

    debug!("Resolved local layout file: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// A layout dump is a JSON object; anything else is rejected early.
fn validate_magic(f: std::fs::File, path: &Path) -> Result<(), ConvertError> {
    use std::io::Read;
    let mut head = [0u8; 64];
    let mut f = f;
    let n = f.read(&mut head).unwrap_or(0);
    let first = head[..n].iter().find(|b| !b.is_ascii_whitespace());
    match first {
        Some(b'{') => Ok(()),
        _ => Err(ConvertError::InvalidLayout {
            path: path.to_path_buf(),
            detail: "expected a JSON object".into(),
        }),
    }
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ConvertError> {
    info!("Downloading layout from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ConvertError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ConvertError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let temp_dir = TempDir::new().map_err(|e| ConvertError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename_from_url(url));
    std::fs::write(&file_path, &bytes).map_err(|e| ConvertError::Internal(e.to_string()))?;

    let f = std::fs::File::open(&file_path).map_err(|e| ConvertError::Internal(e.to_string()))?;
    validate_magic(f, &file_path)?;

    debug!("Downloaded {} bytes to {}", bytes.len(), file_path.display());
    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

fn filename_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains('?'))
        .unwrap_or("layout.json")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn url_detection() {
        assert!(is_url("https://example.com/doc.json"));
        assert!(is_url("http://example.com/doc.json"));
        assert!(!is_url("/tmp/doc.json"));
        assert!(!is_url("doc.json"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_local("/definitely/not/a/real/file.json").unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }

    #[test]
    fn non_json_file_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7 not a layout dump").unwrap();
        let err = resolve_local(f.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidLayout { .. }));
    }

    #[test]
    fn json_file_resolves_locally() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"  {\"pages\": []}").unwrap();
        let resolved = resolve_local(f.path().to_str().unwrap()).unwrap();
        assert_eq!(resolved.path(), f.path());
    }

    #[test]
    fn filename_extraction() {
        assert_eq!(
            filename_from_url("https://x.com/a/b/layout-v2.json"),
            "layout-v2.json"
        );
        assert_eq!(filename_from_url("https://x.com/dl?id=3"), "layout.json");
    }
}
