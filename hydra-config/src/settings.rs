// Typed server settings

use crate::{ConfigValidator, Result, Validate};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;
use std::path::PathBuf;

/// Build mode of the client bundle being served.
///
/// Development builds are rebuilt while the server runs, so the asset
/// manifest is re-read per request and assets are never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    #[serde(alias = "dev")]
    Development,
    #[serde(alias = "prod")]
    Production,
}

impl Mode {
    pub fn is_development(&self) -> bool {
        matches!(self, Mode::Development)
    }
}

/// Settings for an SSR server, deserialized from the merged configuration.
///
/// Text settings also accept numbers and booleans, since environment and
/// `.env` values are typed before the target field is known
/// (`HYDRA_TITLE=2024` arrives as a number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    #[serde(deserialize_with = "scalar_string")]
    pub host: String,
    pub port: u16,
    pub mode: Mode,
    /// Client build output (holds the manifest and hashed assets)
    #[serde(deserialize_with = "scalar_path")]
    pub build_dir: PathBuf,
    /// Manifest file name, relative to `build_dir`
    #[serde(deserialize_with = "scalar_string")]
    pub manifest_file: String,
    /// Logical entry name; `<entry>.js` and `<entry>.css` are looked up in the manifest
    #[serde(deserialize_with = "scalar_string")]
    pub client_entry: String,
    /// URL prefix static assets are served under
    #[serde(deserialize_with = "scalar_string")]
    pub static_prefix: String,
    /// Upper bound on a route's data fetch during SSR
    pub fetch_timeout_ms: u64,
    #[serde(deserialize_with = "scalar_string")]
    pub title: String,
    /// Id of the element the app is rendered into and hydrated from
    #[serde(deserialize_with = "scalar_string")]
    pub mount_id: String,
}

fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::invalid_type(
            de::Unexpected::Other(&other.to_string()),
            &"a string, number or boolean",
        )),
    }
}

fn scalar_path<'de, D>(deserializer: D) -> std::result::Result<PathBuf, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_string(deserializer).map(PathBuf::from)
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            mode: Mode::Development,
            build_dir: PathBuf::from("dist/client"),
            manifest_file: "manifest.json".to_string(),
            client_entry: "client-entry".to_string(),
            static_prefix: "/".to_string(),
            fetch_timeout_ms: 5_000,
            title: "Document".to_string(),
            mount_id: "app".to_string(),
        }
    }
}

impl ServerSettings {
    /// `host:port` for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.build_dir.join(&self.manifest_file)
    }
}

impl Validate for ServerSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.host, "host")?;
        ConfigValidator::is_port(self.port, "port")?;
        ConfigValidator::not_empty(&self.manifest_file, "manifest_file")?;
        ConfigValidator::not_empty(&self.client_entry, "client_entry")?;
        ConfigValidator::is_url_path(&self.static_prefix, "static_prefix")?;
        ConfigValidator::in_range(self.fetch_timeout_ms, 1, 600_000, "fetch_timeout_ms")?;
        ConfigValidator::not_empty(&self.mount_id, "mount_id")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = ServerSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.bind_address(), "127.0.0.1:3000");
        assert_eq!(
            settings.manifest_path(),
            PathBuf::from("dist/client/manifest.json")
        );
    }

    #[test]
    fn test_mode_aliases() {
        let mode: Mode = serde_json::from_str("\"prod\"").unwrap();
        assert_eq!(mode, Mode::Production);
        let mode: Mode = serde_json::from_str("\"development\"").unwrap();
        assert!(mode.is_development());
    }

    #[test]
    fn test_text_settings_accept_scalars() {
        let settings: ServerSettings = serde_json::from_value(serde_json::json!({
            "title": 2024,
            "mount_id": true,
            "build_dir": 7,
            "port": 8080,
        }))
        .unwrap();

        assert_eq!(settings.title, "2024");
        assert_eq!(settings.mount_id, "true");
        assert_eq!(settings.build_dir, PathBuf::from("7"));
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.host, "127.0.0.1");

        let nested = serde_json::from_value::<ServerSettings>(serde_json::json!({"title": ["a"]}));
        assert!(nested.is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let settings = ServerSettings {
            fetch_timeout_ms: 0,
            ..ServerSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_relative_static_prefix_rejected() {
        let settings = ServerSettings {
            static_prefix: "assets".to_string(),
            ..ServerSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
