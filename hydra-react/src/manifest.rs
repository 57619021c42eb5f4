// Client build asset manifest

use crate::error::{Result, SsrError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Logical asset name to public path, as written by the client bundler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    entries: HashMap<String, String>,
}

impl AssetManifest {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Parse `{"client-entry.js": "/client-entry.1a2b.js", ...}`. Non-string
    /// values are rejected.
    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(raw)
            .map_err(|e| SsrError::Manifest(format!("invalid manifest: {}", e)))?;
        Ok(Self { entries })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            SsrError::Manifest(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Script for `entry`; a manifest without it is unusable.
    pub fn entry_script(&self, entry: &str) -> Result<&str> {
        let key = format!("{}.js", entry);
        self.get(&key)
            .ok_or_else(|| SsrError::Manifest(format!("manifest has no entry {}", key)))
    }

    /// Stylesheet for `entry`, if the build extracted one.
    pub fn entry_stylesheet(&self, entry: &str) -> Option<&str> {
        self.get(&format!("{}.css", entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

enum Origin {
    File { path: PathBuf, reload: bool },
    Fixed,
}

/// Where the current manifest comes from. A file source either reads once and
/// caches, or re-reads on every call while the client is rebuilt.
#[derive(Clone)]
pub struct ManifestSource {
    origin: Arc<Origin>,
    cached: Arc<RwLock<Option<Arc<AssetManifest>>>>,
}

impl ManifestSource {
    pub fn from_path(path: impl Into<PathBuf>, reload: bool) -> Self {
        Self {
            origin: Arc::new(Origin::File {
                path: path.into(),
                reload,
            }),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub fn fixed(manifest: AssetManifest) -> Self {
        Self {
            origin: Arc::new(Origin::Fixed),
            cached: Arc::new(RwLock::new(Some(Arc::new(manifest)))),
        }
    }

    pub async fn current(&self) -> Result<Arc<AssetManifest>> {
        match self.origin.as_ref() {
            Origin::Fixed => self
                .cached
                .read()
                .clone()
                .ok_or_else(|| SsrError::Manifest("manifest not set".to_string())),
            Origin::File { path, reload } => {
                if !*reload && let Some(manifest) = self.cached.read().clone() {
                    return Ok(manifest);
                }

                let manifest = Arc::new(AssetManifest::load(path).await?);
                tracing::debug!(path = %path.display(), entries = manifest.len(), "manifest loaded");
                if !*reload {
                    *self.cached.write() = Some(manifest.clone());
                }
                Ok(manifest)
            }
        }
    }
}

impl std::fmt::Debug for ManifestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.origin.as_ref() {
            Origin::File { path, reload } => f
                .debug_struct("ManifestSource")
                .field("path", path)
                .field("reload", reload)
                .finish(),
            Origin::Fixed => f.debug_struct("ManifestSource").field("fixed", &true).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entries() {
        let manifest = AssetManifest::from_json(
            r#"{"client-entry.js": "/c.1.js", "client-entry.css": "/c.1.css"}"#,
        )
        .unwrap();
        assert_eq!(manifest.entry_script("client-entry").unwrap(), "/c.1.js");
        assert_eq!(manifest.entry_stylesheet("client-entry"), Some("/c.1.css"));
        assert!(manifest.entry_script("admin").is_err());
    }

    #[test]
    fn test_invalid_manifest() {
        assert!(matches!(
            AssetManifest::from_json("[1, 2]"),
            Err(SsrError::Manifest(_))
        ));
    }

    #[tokio::test]
    async fn test_reload_vs_cached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, r#"{"client-entry.js": "/a.js"}"#).unwrap();

        let reloading = ManifestSource::from_path(&path, true);
        let cached = ManifestSource::from_path(&path, false);
        assert_eq!(reloading.current().await.unwrap().get("client-entry.js"), Some("/a.js"));
        assert_eq!(cached.current().await.unwrap().get("client-entry.js"), Some("/a.js"));

        std::fs::write(&path, r#"{"client-entry.js": "/b.js"}"#).unwrap();
        assert_eq!(reloading.current().await.unwrap().get("client-entry.js"), Some("/b.js"));
        assert_eq!(cached.current().await.unwrap().get("client-entry.js"), Some("/a.js"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let source = ManifestSource::from_path("/definitely/not/here.json", true);
        assert!(matches!(source.current().await, Err(SsrError::Manifest(_))));
    }
}
