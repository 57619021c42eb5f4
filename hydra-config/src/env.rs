// Environment variable loading

use crate::loader::parse_scalar;
use serde_json::Value;
use std::collections::HashMap;
use std::env;

/// Collects prefixed environment variables as lower-case setting keys.
///
/// With prefix `HYDRA`, `HYDRA_FETCH_TIMEOUT_MS=3000` becomes
/// `fetch_timeout_ms = 3000`. Variables without the prefix are ignored.
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into().to_uppercase();
        if !prefix.is_empty() && !prefix.ends_with('_') {
            prefix.push('_');
        }
        Self { prefix }
    }

    /// Read the process environment.
    pub fn load(&self) -> HashMap<String, Value> {
        self.load_from(env::vars())
    }

    /// Read from an explicit set of variables.
    pub fn load_from<I>(&self, vars: I) -> HashMap<String, Value>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| {
                let key = key.strip_prefix(&self.prefix)?;
                if key.is_empty() {
                    return None;
                }
                Some((key.to_lowercase(), parse_scalar(&value)))
            })
            .collect()
    }

    /// The full variable name a setting key is read from.
    pub fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_uppercase())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new("HYDRA")
    }
}
