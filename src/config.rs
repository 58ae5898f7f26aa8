use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_BASE_URL: &str = "LIVE_PARTIAL_BASE_URL";
pub const ENV_DEBOUNCE_MS: &str = "LIVE_PARTIAL_DEBOUNCE_MS";
pub const ENV_MAX_WAIT_MS: &str = "LIVE_PARTIAL_MAX_WAIT_MS";
pub const ENV_CSRF_HEADER: &str = "LIVE_PARTIAL_CSRF_HEADER";
pub const ENV_SHARED_NAMESPACE: &str = "LIVE_PARTIAL_SHARED_NAMESPACE";
pub const ENV_DISCARD_STALE: &str = "LIVE_PARTIAL_DISCARD_STALE_RESPONSES";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("environment error: {0}")]
    Env(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivePartialConfig {
    /// Page origin the `/{controller}/{action}` path is joined to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Upper bound on how long a continuous burst may defer a sync.
    #[serde(default)]
    pub max_wait_ms: Option<u64>,
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,
    /// Prefix applied to lookup names without a `/`.
    #[serde(default = "default_shared_namespace")]
    pub shared_namespace: String,
    /// Skip rendering a response when a newer request has already rendered.
    #[serde(default)]
    pub discard_stale_responses: bool,
}

impl Default for LivePartialConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            debounce_ms: default_debounce_ms(),
            max_wait_ms: None,
            csrf_header: default_csrf_header(),
            shared_namespace: default_shared_namespace(),
            discard_stale_responses: false,
        }
    }
}

impl LivePartialConfig {
    /// Build from `LIVE_PARTIAL_*` variables resolved through `lookup`.
    /// Unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_BASE_URL) {
            config.base_url = value;
        }
        if let Some(value) = lookup(ENV_DEBOUNCE_MS) {
            config.debounce_ms = parse_u64(ENV_DEBOUNCE_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_WAIT_MS) {
            config.max_wait_ms = match value.trim() {
                "" => None,
                raw => Some(parse_u64(ENV_MAX_WAIT_MS, raw)?),
            };
        }
        if let Some(value) = lookup(ENV_CSRF_HEADER) {
            config.csrf_header = value;
        }
        if let Some(value) = lookup(ENV_SHARED_NAMESPACE) {
            config.shared_namespace = value;
        }
        if let Some(value) = lookup(ENV_DISCARD_STALE) {
            config.discard_stale_responses = parse_bool(ENV_DISCARD_STALE, &value)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(error) = dotenvy::dotenv() {
            if !error.not_found() {
                return Err(ConfigError::Env(error.to_string()));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings from a dotenv file without touching the process environment.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut entries = Vec::new();
        let iter = dotenvy::from_path_iter(path.as_ref())
            .map_err(|error| ConfigError::Env(error.to_string()))?;
        for item in iter {
            entries.push(item.map_err(|error| ConfigError::Env(error.to_string()))?);
        }
        Self::from_lookup(|key| {
            entries
                .iter()
                .rev()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url cannot be empty".to_string()));
        }
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid(
                "debounce_ms must be greater than 0".to_string(),
            ));
        }
        if let Some(max_wait) = self.max_wait_ms {
            if max_wait < self.debounce_ms {
                return Err(ConfigError::Invalid(format!(
                    "max_wait_ms ({max_wait}) cannot be shorter than debounce_ms ({})",
                    self.debounce_ms
                )));
            }
        }
        if self.csrf_header.trim().is_empty() {
            return Err(ConfigError::Invalid("csrf_header cannot be empty".to_string()));
        }
        if self.shared_namespace.trim().is_empty() || self.shared_namespace.contains('/') {
            return Err(ConfigError::Invalid(
                "shared_namespace must be a single non-empty path segment".to_string(),
            ));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key} must be an integer, got {value:?}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid(format!(
            "{key} must be a boolean, got {value:?}"
        ))),
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_csrf_header() -> String {
    "X-CSRF-Token".to_string()
}

fn default_shared_namespace() -> String {
    "shared".to_string()
}
