//! Configuration for vigild.
//!
//! Loads settings from /etc/vigil/config.toml or uses defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, warn};
use vigil_common::llm_client::CompletionConfig;

/// Config file path.
pub const CONFIG_PATH: &str = "/etc/vigil/config.toml";

/// Fallback config file path.
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/vigil/config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub llm: CompletionConfig,

    #[serde(default)]
    pub summarize: SummarizeConfig,
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address; localhost only by default.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:5870".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Document store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    crate::store::DB_PATH.to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Summarization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeConfig {
    /// Trailing telemetry window handed to the provider, in seconds.
    #[serde(default = "default_lookback_secs")]
    pub lookback_secs: u64,
}

fn default_lookback_secs() -> u64 {
    crate::answerer::DEFAULT_LOOKBACK_SECS
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            lookback_secs: default_lookback_secs(),
        }
    }
}

impl Config {
    /// Load from the standard locations, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH)
            .or_else(|_| Self::load_from_path(DEFAULT_CONFIG_PATH))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            })
    }

    /// Load config from a specific path.
    fn load_from_path(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path);
        Ok(config)
    }
}
