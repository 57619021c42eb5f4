// React SSR Configuration

use crate::fetch::DEFAULT_FETCH_TIMEOUT;
use hydra_config::{Mode, ServerSettings};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for React Server-Side Rendering
#[derive(Debug, Clone)]
pub struct ReactConfig {
    /// Client build output directory (holds the manifest and hashed assets)
    pub build_dir: PathBuf,

    /// Manifest file name, relative to `build_dir`
    pub manifest_file: String,

    /// Logical entry name (e.g., "client-entry")
    pub client_entry: String,

    /// URL prefix static assets are served under
    pub static_prefix: String,

    /// Development reloads the manifest per request and disables asset caching
    pub mode: Mode,

    /// Upper bound on a route's data fetch
    pub fetch_timeout: Duration,

    /// Document title
    pub title: String,

    /// Id of the mount element
    pub mount_id: String,

    /// Global the initial state is assigned to
    pub state_global: String,
}

impl ReactConfig {
    /// Create a new React configuration
    pub fn new(build_dir: PathBuf) -> Self {
        Self {
            build_dir,
            manifest_file: "manifest.json".to_string(),
            client_entry: "client-entry".to_string(),
            static_prefix: "/".to_string(),
            mode: Mode::Development,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            title: "Document".to_string(),
            mount_id: "app".to_string(),
            state_global: "__INIT_STATE__".to_string(),
        }
    }

    /// Build from validated server settings
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            build_dir: settings.build_dir.clone(),
            manifest_file: settings.manifest_file.clone(),
            client_entry: settings.client_entry.clone(),
            static_prefix: settings.static_prefix.clone(),
            mode: settings.mode,
            fetch_timeout: Duration::from_millis(settings.fetch_timeout_ms),
            title: settings.title.clone(),
            mount_id: settings.mount_id.clone(),
            ..Self::new(settings.build_dir.clone())
        }
    }

    /// Set the manifest file name
    pub fn with_manifest_file(mut self, file: impl Into<String>) -> Self {
        self.manifest_file = file.into();
        self
    }

    /// Set the client entry name
    pub fn with_client_entry(mut self, entry: impl Into<String>) -> Self {
        self.client_entry = entry.into();
        self
    }

    /// Set the static asset prefix
    pub fn with_static_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.static_prefix = prefix.into();
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the fetch timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_mount_id(mut self, id: impl Into<String>) -> Self {
        self.mount_id = id.into();
        self
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.build_dir.join(&self.manifest_file)
    }

    pub fn is_development(&self) -> bool {
        self.mode.is_development()
    }
}
