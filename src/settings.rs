//! Settings and configuration file loading.
//!
//! Precedence, lowest to highest: built-in defaults, config file, environment
//! variables (`DATALAB_API_KEY`, `DATALAB_HOST`), CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DatalabError, Result};

/// Default API host.
pub const DEFAULT_HOST: &str = "https://www.datalab.to";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default maximum poll attempts for a single job.
pub const DEFAULT_MAX_POLLS: usize = 300;

/// Default poll interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Resolved settings for constructing a client.
#[derive(Debug, Clone)]
pub struct Settings {
    /// API key. Required before a client can be built.
    pub api_key: Option<String>,
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum poll attempts per job.
    pub max_polls: usize,
    /// Interval between poll attempts.
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_HOST.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_polls: DEFAULT_MAX_POLLS,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl Settings {
    /// Get the API key or fail with a configuration error.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            DatalabError::Config(
                "You must pass in an api_key or set DATALAB_API_KEY.".to_string(),
            )
        })
    }
}

/// Configuration file structure (TOML).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Maximum poll attempts per job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_polls: Option<usize>,
    /// Poll interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
}

impl Config {
    /// Load configuration from a specific file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let expanded = shellexpand::tilde(&path.to_string_lossy().into_owned()).into_owned();
        let contents = std::fs::read_to_string(&expanded)
            .map_err(|e| DatalabError::Config(format!("Failed to read config file: {}", e)))?;
        toml::from_str(&contents)
            .map_err(|e| DatalabError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Discover a config file in the standard location
    /// (`~/.config/datalab/config.toml`), if one exists.
    pub fn discover() -> Option<Self> {
        let path = dirs::config_dir()?.join("datalab").join("config.toml");
        if path.exists() {
            Config::load_from_path(&path).ok()
        } else {
            None
        }
    }

    /// Apply configuration to settings. Only set fields override.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref key) = self.api_key {
            settings.api_key = Some(key.clone());
        }
        if let Some(ref url) = self.base_url {
            settings.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = self.request_timeout {
            settings.timeout = Duration::from_secs(timeout);
        }
        if let Some(max_polls) = self.max_polls {
            settings.max_polls = max_polls;
        }
        if let Some(interval) = self.poll_interval {
            settings.poll_interval = Duration::from_secs(interval);
        }
    }
}

/// Load settings: defaults, then config file, then environment.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<Settings> {
    let mut settings = Settings::default();

    let config = match config_path {
        Some(path) => Some(Config::load_from_path(path)?),
        None => Config::discover(),
    };
    if let Some(config) = config {
        config.apply_to_settings(&mut settings);
    }

    if let Some(key) = std::env::var("DATALAB_API_KEY").ok().filter(|s| !s.is_empty()) {
        settings.api_key = Some(key);
    }
    if let Some(host) = std::env::var("DATALAB_HOST").ok().filter(|s| !s.is_empty()) {
        tracing::debug!("Using DATALAB_HOST from environment: {}", host);
        settings.base_url = host.trim_end_matches('/').to_string();
    }

    Ok(settings)
}
