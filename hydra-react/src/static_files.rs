// Static file serving for the client build

use crate::error::{Result, SsrError};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Serves files from the client build directory.
#[derive(Debug, Clone)]
pub struct StaticFileService {
    root_dir: PathBuf,
    development: bool,
}

impl StaticFileService {
    /// Create a new static file service. The directory need not exist yet;
    /// the client build may still be running.
    pub fn new(root_dir: PathBuf, development: bool) -> Self {
        Self {
            root_dir,
            development,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Serve a static file
    pub async fn serve(&self, path: &str) -> Result<Vec<u8>> {
        let safe_path = self.sanitize_path(path)?;
        let full_path = self.root_dir.join(&safe_path);

        match fs::metadata(&full_path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(SsrError::FileNotFound(path.to_string())),
        }

        fs::read(&full_path).await.map_err(SsrError::Io)
    }

    /// Get the content type for a file
    pub fn content_type(&self, path: &str) -> String {
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string()
    }

    /// `Cache-Control` for a served file. Production bundles carry a content
    /// hash in the file name, so those never change.
    pub fn cache_control(&self, path: &str) -> &'static str {
        if self.development {
            "no-cache"
        } else if is_hashed(path) {
            "public, max-age=31536000, immutable"
        } else {
            "public, max-age=3600"
        }
    }

    /// Sanitize a path to prevent directory traversal
    fn sanitize_path(&self, path: &str) -> Result<PathBuf> {
        let path = path.trim_start_matches('/');
        let decoded = percent_encoding::percent_decode_str(path)
            .decode_utf8()
            .map_err(|_| SsrError::InvalidPath("Invalid UTF-8 in path".to_string()))?;

        let path = Path::new(decoded.as_ref());

        for component in path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(SsrError::InvalidPath(
                        "Directory traversal not allowed".to_string(),
                    ));
                }
            }
        }

        Ok(path.to_path_buf())
    }
}

/// `client-entry.1a2b3c.js` style names: a hex segment of 6+ characters
/// between the stem and the extension.
fn is_hashed(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() >= 3
        && parts[1..parts.len() - 1]
            .iter()
            .any(|p| p.len() >= 6 && p.chars().all(|c| c.is_ascii_hexdigit()))
}
