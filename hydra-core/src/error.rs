// Error types for the HTTP layer

use crate::HttpStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn status(&self) -> HttpStatus {
        match self {
            Error::RouteNotFound(_) | Error::NotFound(_) => HttpStatus::NotFound,
            Error::MethodNotAllowed(_) => HttpStatus::MethodNotAllowed,
            Error::BadRequest(_) => HttpStatus::BadRequest,
            Error::Forbidden(_) => HttpStatus::Forbidden,
            Error::ServiceUnavailable(_) => HttpStatus::ServiceUnavailable,
            Error::Serialization(_) | Error::Internal(_) | Error::Io(_) => {
                HttpStatus::InternalServerError
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.status().code()
    }

    pub fn is_client_error(&self) -> bool {
        !self.status().is_server_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::RouteNotFound("GET /x".into()).status_code(), 404);
        assert_eq!(Error::Forbidden("..".into()).status_code(), 403);
        assert_eq!(Error::Internal("boom".into()).status_code(), 500);
        assert_eq!(
            Error::Io(std::io::Error::other("disk")).status_code(),
            500
        );
        assert_eq!(Error::ServiceUnavailable("warming".into()).status_code(), 503);
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::NotFound("x".into()).is_client_error());
        assert!(!Error::Internal("x".into()).is_client_error());
    }
}
