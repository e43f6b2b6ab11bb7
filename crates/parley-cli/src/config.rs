//! Configuration file support

use parley_sync::{ReconnectConfig, SyncConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Configuration for parley
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat REST API
    pub api_base_url: Option<String>,
    /// Push channel URL. Defaults to the API base URL.
    pub socket_url: Option<String>,
    /// Messages per history page
    pub page_size: Option<u32>,
    /// Seconds to wait for a sent message to come back; 0 disables the check
    pub echo_timeout_secs: Option<u64>,
    /// Push channel reconnection
    pub reconnect: ReconnectSettings,
}

/// Reconnect settings as written in the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub auto_reconnect: Option<bool>,
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PARLEY_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            api_base_url: Some(DEFAULT_API_URL.to_string()),
            socket_url: None,
            page_size: Some(SyncConfig::default().page_size),
            echo_timeout_secs: Some(10),
            reconnect: ReconnectSettings::default(),
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    pub fn api_base_url(&self) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn socket_url(&self) -> String {
        self.socket_url.clone().unwrap_or_else(|| self.api_base_url())
    }

    /// Controller settings, defaults filled in
    pub fn sync_config(&self) -> SyncConfig {
        let defaults = SyncConfig::default();
        SyncConfig {
            page_size: self.page_size.unwrap_or(defaults.page_size),
            echo_timeout: match self.echo_timeout_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.echo_timeout,
            },
        }
    }

    /// Channel reconnect policy, defaults filled in
    pub fn reconnect_config(&self) -> ReconnectConfig {
        let defaults = ReconnectConfig::default();
        let settings = &self.reconnect;
        ReconnectConfig {
            auto_reconnect: settings.auto_reconnect.unwrap_or(defaults.auto_reconnect),
            max_retries: settings.max_retries.unwrap_or(defaults.max_retries),
            initial_delay: settings
                .initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_delay),
            max_delay: settings
                .max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_delay),
            ..defaults
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# parley configuration file
# Place at ~/.config/parley/config.toml (Linux) or set PARLEY_CONFIG_PATH

# Chat REST API
api_base_url = "http://localhost:8000"

# Push channel (defaults to api_base_url; http is mapped to ws)
# socket_url = "ws://localhost:8000"

# Messages fetched per history page
page_size = 15

# Seconds to wait for a sent message to be echoed back (0 disables)
echo_timeout_secs = 10

[reconnect]
# auto_reconnect = true
# max_retries = 5
# initial_delay_ms = 500
# max_delay_ms = 30000
"#
}
