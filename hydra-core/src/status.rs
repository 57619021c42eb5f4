// HTTP status codes used by Hydra servers

/// Status codes Hydra produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok = 200,
    NotModified = 304,
    BadRequest = 400,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    InternalServerError = 500,
    ServiceUnavailable = 503,
    GatewayTimeout = 504,
}

impl HttpStatus {
    pub fn code(&self) -> u16 {
        *self as u16
    }

    pub fn reason(&self) -> &'static str {
        match self {
            HttpStatus::Ok => "OK",
            HttpStatus::NotModified => "Not Modified",
            HttpStatus::BadRequest => "Bad Request",
            HttpStatus::Forbidden => "Forbidden",
            HttpStatus::NotFound => "Not Found",
            HttpStatus::MethodNotAllowed => "Method Not Allowed",
            HttpStatus::InternalServerError => "Internal Server Error",
            HttpStatus::ServiceUnavailable => "Service Unavailable",
            HttpStatus::GatewayTimeout => "Gateway Timeout",
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(HttpStatus::Ok),
            304 => Some(HttpStatus::NotModified),
            400 => Some(HttpStatus::BadRequest),
            403 => Some(HttpStatus::Forbidden),
            404 => Some(HttpStatus::NotFound),
            405 => Some(HttpStatus::MethodNotAllowed),
            500 => Some(HttpStatus::InternalServerError),
            503 => Some(HttpStatus::ServiceUnavailable),
            504 => Some(HttpStatus::GatewayTimeout),
            _ => None,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.code() >= 500
    }
}

impl std::fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for status in [
            HttpStatus::Ok,
            HttpStatus::NotFound,
            HttpStatus::InternalServerError,
        ] {
            assert_eq!(HttpStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(HttpStatus::from_code(418), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(HttpStatus::NotFound.to_string(), "404 Not Found");
        assert!(HttpStatus::GatewayTimeout.is_server_error());
        assert!(!HttpStatus::Forbidden.is_server_error());
    }
}
