//! Layered configuration for Hydra servers.
//!
//! Sources are applied in order, later ones overriding earlier ones:
//! built-in defaults, a settings file (TOML, JSON or `.env`), a `.env` file
//! in the working directory, then `HYDRA_*` environment variables.
//!
//! ```no_run
//! use hydra_config::{ConfigManager, ServerSettings};
//!
//! let config = ConfigManager::builder()
//!     .file("hydra.toml")
//!     .dotenv()
//!     .env()
//!     .build()?;
//!
//! let settings: ServerSettings = config.settings()?;
//! println!("listening on {}", settings.bind_address());
//! # Ok::<(), hydra_config::ConfigError>(())
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{Mode, ServerSettings};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Merged key/value configuration.
#[derive(Clone, Default)]
pub struct ConfigManager {
    values: Arc<RwLock<Map<String, Value>>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Merge every top-level key of a settings file.
    pub fn load_file(&self, path: &Path) -> Result<()> {
        let data = ConfigLoader::auto(path)?.load_file(path)?;
        if let Value::Object(map) = data {
            self.values.write().extend(map);
        }
        tracing::debug!(path = %path.display(), "loaded settings file");
        Ok(())
    }

    /// Merge prefixed environment variables.
    pub fn load_env(&self, loader: &EnvLoader) {
        self.values.write().extend(loader.load());
    }

    /// Export a `.env` file into the process environment, then merge the
    /// prefixed variables. A missing default `.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&Path>, loader: &EnvLoader) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env(loader);
        Ok(())
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .values
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value)
            .map_err(|e| ConfigError::DeserializationError(format!("{}: {}", key, e)))
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    /// Deserialize the whole configuration into `T` and validate it.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let snapshot = Value::Object(self.values.read().clone());
        let typed: T = serde_json::from_value(snapshot)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        typed.validate()?;
        Ok(typed)
    }

    /// Shorthand for `load_validated::<ServerSettings>()`.
    pub fn settings(&self) -> Result<ServerSettings> {
        self.load_validated()
    }
}

/// Declares which sources a [`ConfigManager`] is built from.
pub struct ConfigBuilder {
    files: Vec<PathBuf>,
    optional_files: Vec<PathBuf>,
    dotenv: Option<Option<PathBuf>>,
    env: bool,
    env_loader: EnvLoader,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            optional_files: Vec::new(),
            dotenv: None,
            env: false,
            env_loader: EnvLoader::default(),
        }
    }

    /// Settings file that must exist.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Settings file loaded only if present.
    pub fn optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.optional_files.push(path.into());
        self
    }

    /// Load `.env` from the working directory when present.
    pub fn dotenv(mut self) -> Self {
        self.dotenv = Some(None);
        self
    }

    pub fn dotenv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv = Some(Some(path.into()));
        self
    }

    pub fn env(mut self) -> Self {
        self.env = true;
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_loader = EnvLoader::new(prefix);
        self
    }

    pub fn build(self) -> Result<ConfigManager> {
        let manager = ConfigManager::new();

        for path in &self.files {
            manager.load_file(path)?;
        }
        for path in &self.optional_files {
            if path.exists() {
                manager.load_file(path)?;
            }
        }
        if let Some(path) = &self.dotenv {
            manager.load_dotenv(path.as_deref(), &self.env_loader)?;
        }
        if self.env {
            manager.load_env(&self.env_loader);
        }

        Ok(manager)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
