// Settings validation

use crate::{ConfigError, Result};

/// Implemented by typed settings that can be checked after loading.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable checks for [`Validate`] implementations.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    pub fn in_range<T: PartialOrd + std::fmt::Display>(
        value: T,
        min: T,
        max: T,
        field: &str,
    ) -> Result<()> {
        if value < min || value > max {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between {} and {}, got {}",
                field, min, max, value
            )));
        }
        Ok(())
    }

    pub fn is_port(value: u16, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be a valid port number",
                field
            )));
        }
        Ok(())
    }

    /// URL paths such as a static prefix must be absolute.
    pub fn is_url_path(value: &str, field: &str) -> Result<()> {
        if !value.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "{} must start with '/', got {:?}",
                field, value
            )));
        }
        Ok(())
    }
}
