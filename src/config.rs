// File: ./src/config.rs
// Handles configuration loading, saving, validation and defaults.
use crate::context::AppContext;
use crate::storage::{atomic_write, with_lock};
use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("clinicdesk/{}", env!("CARGO_PKG_VERSION"))
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the REST backend, e.g. `https://api.example.com/v1`.
    pub api_url: String,
    #[serde(default)]
    pub allow_insecure_certs: bool,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            allow_insecure_certs: false,
            // Match the serde defaults
            request_timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Rejects settings the HTTP stack cannot work with.
    pub fn validate(&self) -> Result<()> {
        let url = self.api_url.trim();
        if url.is_empty() {
            return Err(anyhow::anyhow!("api_url is not set"));
        }
        let uri: http::Uri = url
            .parse()
            .map_err(|e| anyhow::anyhow!("api_url '{}' is not a valid URL: {}", url, e))?;
        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "api_url '{}' must start with http:// or https://",
                    url
                ));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("request_timeout_secs must be greater than 0"));
        }
        Ok(())
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }

    /// Load the configuration from disk using an explicit context.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        // Explicitly detect missing file so callers (first run) can behave accordingly.
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;

        Ok(config)
    }

    /// Whether an error from `load` means the config file does not exist yet.
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }

        err.chain().any(|cause| {
            cause
                .downcast_ref::<std::io::Error>()
                .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
        })
    }

    /// Save configuration using an explicit context.
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        with_lock(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            atomic_write(&path, toml_str)?;
            Ok(())
        })
    }

    pub fn get_path_string(ctx: &dyn AppContext) -> Result<String> {
        let path = ctx.get_config_file_path()?;
        Ok(path.to_string_lossy().to_string())
    }
}
