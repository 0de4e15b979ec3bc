//! Client configuration (layered: defaults < config file < env < code).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AskflowError;
use crate::hooks::HookPipeline;
use crate::trace::{TraceHook, Tracer};
use crate::util::RetryPolicy;

/// File name looked up inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_API_BASE";
pub const DEFAULT_MODEL_ENV: &str = "ASKFLOW_DEFAULT_MODEL";

/// Client-level settings shared read-only by every ask call.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub hooks: HookPipeline,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            default_model: None,
            retry: RetryPolicy::default(),
            request_timeout: crate::provider::http::DEFAULT_REQUEST_TIMEOUT,
            hooks: HookPipeline::default(),
        }
    }
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    default_model: Option<String>,
    request_timeout_secs: Option<u64>,
    retry: Option<RetryPolicy>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, then `~/.askflow/config.toml` if present, then the
    /// environment (`.env` included).
    pub fn from_env() -> Result<Self, AskflowError> {
        let mut config = Self::default();
        if let Some(path) = default_config_path().filter(|p| p.is_file()) {
            config.apply_file(&path)?;
        }
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Defaults overlaid with an explicit config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AskflowError> {
        let mut config = Self::default();
        config.apply_file(path.as_ref())?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), AskflowError> {
        let raw = std::fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&raw).map_err(|e| {
            AskflowError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");

        if file.api_key.is_some() {
            self.api_key = file.api_key;
        }
        if file.base_url.is_some() {
            self.base_url = file.base_url;
        }
        if file.default_model.is_some() {
            self.default_model = file.default_model;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retry) = file.retry {
            self.retry = retry;
        }
        Ok(())
    }

    /// Overlay values found through `lookup` (normally `std::env::var`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(url) = non_empty(BASE_URL_ENV) {
            self.base_url = Some(url);
        }
        if let Some(model) = non_empty(DEFAULT_MODEL_ENV) {
            self.default_model = Some(model);
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Append hooks after the ones already registered.
    pub fn with_hooks(mut self, hooks: HookPipeline) -> Self {
        self.hooks.extend(&hooks);
        self
    }

    /// Record every generation through `tracer`.
    pub fn with_tracer(self, tracer: Arc<dyn Tracer>) -> Self {
        let hooks = TraceHook::new(tracer).hooks();
        self.with_hooks(hooks)
    }
}

/// `~/.askflow/config.toml`, when a home directory can be resolved.
pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".askflow").join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
default_model = "gpt-4o-mini"
base_url = "http://localhost:8080/v1"
request_timeout_secs = 5

[retry]
max_attempts = 5
initial_backoff = 10
"#,
        );

        let config = ClientConfig::from_file(&path).unwrap();

        assert_eq!(config.default_model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080/v1"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(10));
        assert_eq!(config.retry.max_backoff, RetryPolicy::default().max_backoff);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "modle = \"typo\"\n");

        let err = ClientConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, AskflowError::Configuration(_)));
    }

    #[test]
    fn env_overrides_file_and_builder_overrides_env() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "default_model = \"from-file\"\napi_key = \"file-key\"\n");
        let env: HashMap<&str, &str> = [(DEFAULT_MODEL_ENV, "from-env"), (BASE_URL_ENV, "")].into();

        let mut config = ClientConfig::from_file(&path).unwrap();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.default_model.as_deref(), Some("from-env"));
        assert_eq!(config.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.base_url, None);

        let config = config.with_default_model("explicit");
        assert_eq!(config.default_model.as_deref(), Some("explicit"));
    }
}
