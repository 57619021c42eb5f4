// Settings file parsing

use crate::{ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Formats a settings file may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Detect the format from a path's extension. `.env` files have no
    /// extension in the usual sense, so the file name is checked too.
    pub fn detect(path: &Path) -> Option<Self> {
        if path.file_name().and_then(|n| n.to_str()) == Some(".env") {
            return Some(FileFormat::Env);
        }
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Parses settings files into a flat JSON object.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Pick the loader from the file extension.
    pub fn auto(path: &Path) -> Result<Self> {
        FileFormat::detect(path).map(Self::new).ok_or_else(|| {
            ConfigError::LoadError(format!("Unsupported settings file: {}", path.display()))
        })
    }

    pub fn load_file(&self, path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        self.parse(&content)
    }

    pub fn parse(&self, content: &str) -> Result<Value> {
        let value = match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))?,
            FileFormat::Toml => parse_toml(content)?,
            FileFormat::Env => parse_env(content),
        };

        if !value.is_object() {
            return Err(ConfigError::ParseError(
                "Settings file must contain a table at the top level".to_string(),
            ));
        }

        Ok(value)
    }
}

fn parse_toml(content: &str) -> Result<Value> {
    let toml_value: toml::Value = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

    serde_json::to_value(toml_value).map_err(|e| ConfigError::SerializationError(e.to_string()))
}

fn parse_env(content: &str) -> Value {
    let mut map = serde_json::Map::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            map.insert(key.trim().to_lowercase(), parse_scalar(value));
        }
    }

    Value::Object(map)
}

/// Interpret a raw string setting as a number or boolean when it reads as
/// one, so `PORT=8080` deserializes into a `u16`. Text that would not print
/// back unchanged (`007`, `1.10`) stays a string.
pub fn parse_scalar(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(n) = raw.parse::<i64>()
        && n.to_string() == raw
    {
        return Value::from(n);
    }
    if let Ok(n) = raw.parse::<f64>()
        && n.is_finite()
        && n.to_string() == raw
    {
        return Value::from(n);
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let value = loader.parse(r#"{"port": 4000, "mode": "production"}"#).unwrap();
        assert_eq!(value["port"], 4000);
        assert_eq!(value["mode"], "production");
    }

    #[test]
    fn test_parse_json_rejects_non_object() {
        let loader = ConfigLoader::new(FileFormat::Json);
        assert!(loader.parse("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let value = loader
            .parse(
                r#"
                port = 8080
                build_dir = "dist/client"
                "#,
            )
            .unwrap();
        assert_eq!(value["port"], 8080);
        assert_eq!(value["build_dir"], "dist/client");
    }

    #[test]
    fn test_parse_env_coerces_scalars() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let value = loader
            .parse(
                r#"
                # comment
                PORT=8080
                DEBUG=true
                TITLE="My App"
                "#,
            )
            .unwrap();
        assert_eq!(value["port"], 8080);
        assert_eq!(value["debug"], true);
        assert_eq!(value["title"], "My App");
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            FileFormat::detect(Path::new("hydra.toml")),
            Some(FileFormat::Toml)
        );
        assert_eq!(
            FileFormat::detect(Path::new("conf/hydra.json")),
            Some(FileFormat::Json)
        );
        assert_eq!(FileFormat::detect(Path::new(".env")), Some(FileFormat::Env));
        assert_eq!(FileFormat::detect(Path::new("hydra.yaml")), None);
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_scalar("42"), Value::from(42));
        assert_eq!(parse_scalar("false"), Value::Bool(false));
        assert_eq!(parse_scalar("0.5"), Value::from(0.5));
        assert_eq!(parse_scalar("/about"), Value::String("/about".to_string()));
        assert_eq!(parse_scalar("007"), Value::String("007".to_string()));
        assert_eq!(parse_scalar("1.10"), Value::String("1.10".to_string()));
    }
}
