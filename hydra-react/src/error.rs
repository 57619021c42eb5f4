// Error types for SSR and hydration

use hydra_core::{Error as HttpError, HttpStatus};
use std::time::Duration;
use thiserror::Error;

/// Error type produced by views and fetchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum SsrError {
    #[error("No route matches {0}")]
    RouteNotFound(String),

    #[error("Data fetch for route {route} failed: {message}")]
    FetchFailure { route: String, message: String },

    #[error("Data fetch for route {route} timed out after {timeout:?}")]
    FetchTimeout { route: String, timeout: Duration },

    #[error("Data fetch for route {0} was cancelled")]
    FetchCancelled(String),

    #[error("Rendering route {route} failed: {message}")]
    RenderFailure { route: String, message: String },

    #[error("Asset manifest error: {0}")]
    Manifest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Static file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SsrError {
    pub fn status(&self) -> HttpStatus {
        match self {
            SsrError::RouteNotFound(_) | SsrError::FileNotFound(_) => HttpStatus::NotFound,
            SsrError::InvalidPath(_) => HttpStatus::Forbidden,
            _ => HttpStatus::InternalServerError,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status().code()
    }

    /// Timeouts count as fetch failures.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            SsrError::FetchFailure { .. } | SsrError::FetchTimeout { .. }
        )
    }
}

impl From<SsrError> for HttpError {
    fn from(err: SsrError) -> Self {
        match err {
            SsrError::RouteNotFound(path) => HttpError::RouteNotFound(path),
            SsrError::FileNotFound(path) => HttpError::NotFound(path),
            SsrError::InvalidPath(path) => HttpError::Forbidden(path),
            SsrError::Io(err) => HttpError::Io(err),
            other => HttpError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SsrError>;
