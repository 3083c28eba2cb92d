//! Service configuration, read from a TOML file.
//!
//! With no explicit path, `config.toml` in the app config directory is used
//! (see [app_data](crate::app_data)); a missing default file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::chunks::DEFAULT_CHUNK_SIZE;
use crate::embed::{DEFAULT_AZURE_API_VERSION, DEFAULT_OLLAMA_MODEL};
use crate::store::DEFAULT_TOP_K;

const CONFIG_FILENAME: &str = "config.toml";

/// Environment variable that overrides `embedding.api_key`.
pub const API_KEY_ENV: &str = "DOCSIFT_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Words per chunk.
    pub chunk_size: usize,
    /// Results returned by a query when the caller does not ask for a count.
    pub top_k: usize,
    /// Upper bound on a single embedding call.
    pub embed_timeout_secs: u64,
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
            embed_timeout_secs: 30,
            server: ServerConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl Config {
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be greater than zero".into()));
        }
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be greater than zero".into()));
        }
        if self.embed_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "embed_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_upload_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.embedding.api_key = Some(key);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
            enable_cors: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Azure,
    Ollama,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    /// Azure resource root, or Ollama base URL (defaults to localhost).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Azure deployment name.
    pub deployment: String,
    pub api_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Ollama model name.
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            endpoint: None,
            deployment: "text-embedding-ada-002".to_string(),
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            api_key: None,
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}

/// Location of the default config file, if the app config directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    app_data::app_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Load, apply environment overrides, and validate.
///
/// An explicit `path` must exist. Without one, the default file is read if
/// present, otherwise defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => match default_config_path() {
            Some(path) if path.is_file() => read_config(&path)?,
            _ => Config::default(),
        },
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    toml::from_str(&s).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
}

/// Write `config` as TOML, to `path` or the default location.
/// Returns the path written.
pub fn save_config(config: &Config, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path().ok_or(ConfigError::NoDataDir)?,
    };
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(&path, s).map_err(ConfigError::Write)?;
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app config directory")]
    NoDataDir,
    #[error("failed to read config {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("invalid config {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
