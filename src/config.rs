//! Configuration, persisted as TOML.
//!
//! The default location is `$XDG_CONFIG_HOME/mpx-chunky/chunky.toml`
//! (see [`ChunkyPaths`](crate::paths::ChunkyPaths)). Every field has a default,
//! so a partial file is valid.

use std::path::Path;
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration handling.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(chunky::config::read),
        help("Ensure the config file exists. `chunky init` writes a default one.")
    )]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(chunky::config::parse),
        help("Check the TOML syntax in the config file: {message}")
    )]
    ConfigParse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(chunky::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    ConfigWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(chunky::config::invalid),
        help("Fix the named setting in the config file or on the command line.")
    )]
    Invalid { message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Connection settings for the remote search service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the instance, e.g. `https://host/MpWeb-mpInstance`.
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per request, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every further retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

/// Pagination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Primary records per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    /// Related types resolved into every chunk, in this order.
    #[serde(default = "default_secondary_types")]
    pub secondary_types: Vec<String>,
    /// Skip media that cannot be shown in a browser.
    #[serde(default)]
    pub only_published: bool,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkyConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    500
}
fn default_chunk_size() -> u32 {
    1000
}
fn default_secondary_types() -> Vec<String> {
    vec!["Multimedia".into(), "Person".into()]
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Check the settings needed to talk to a live service.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Invalid {
                message: "remote.base_url must not be empty".to_string(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                message: format!(
                    "remote.base_url must start with http:// or https://, got \"{}\"",
                    self.base_url
                ),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                message: "remote.max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            secondary_types: default_secondary_types(),
            only_published: false,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                message: "chunking.chunk_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl ChunkyConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigRead {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from `path` if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ConfigWrite {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::ConfigWrite {
            path: path.display().to_string(),
            source: e,
        })
    }
}
