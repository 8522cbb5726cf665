//! Client configuration
//!
//! Defaults, overridden by `$CONFIG_DIR/capsearch/config.toml`, overridden
//! by `CAPSEARCH_*` environment variables. The CLI applies its flags last.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const ENV_BASE_URL: &str = "CAPSEARCH_BASE_URL";
pub const ENV_API_VERSION: &str = "CAPSEARCH_API_VERSION";

const DEFAULT_BASE_URL: &str = "https://findyoutubevideo.thetechrobo.ca";
const DEFAULT_API_VERSION: u32 = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    /// Lookup service root, without the `/api/...` path
    pub base_url: String,
    /// Feed protocol version requested from the server
    pub api_version: u32,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    /// Surface protocol violations as decode errors
    pub strict: bool,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION,
            user_agent: format!("capsearch/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_secs: 15,
            strict: false,
        }
    }
}

impl FinderConfig {
    /// `$CONFIG_DIR/capsearch/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("capsearch").join("config.toml"))
    }

    /// Load the config file (if any) and apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `CAPSEARCH_*` overrides using `lookup` to read variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(value) = lookup(ENV_API_VERSION) {
            self.api_version = value.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_API_VERSION,
                value,
            })?;
        }
        Ok(())
    }
}
