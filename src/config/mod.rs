//! Console configuration: provider credentials, lifecycle timings, catalog.
//!
//! User-level config: `~/.inference-console/console.yaml`.
//! An explicit `--config` path replaces the user file.
//!
//! Resolution: explicit file → user file → built-in defaults, then
//! `ANTHROPIC_API_KEY` fills a missing provider key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogError, ModelSpec};
use crate::lifecycle::LifecycleSettings;

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Inference backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Backend model ID or alias (`sonnet`, `haiku`, ...).
    pub model: String,
    pub max_tokens: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "sonnet".into(),
            max_tokens: 1024,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConsoleConfig {
    pub provider: ProviderSettings,
    pub lifecycle: LifecycleSettings,
    /// Catalog override. Empty means the built-in catalog.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub catalog: Vec<ModelSpec>,
}

/// Path to `~/.inference-console/console.yaml`.
pub fn user_config_path() -> Option<PathBuf> {
    #[cfg(windows)]
    let home = std::env::var("USERPROFILE").ok();
    #[cfg(not(windows))]
    let home = std::env::var("HOME").ok();

    home.map(|h| PathBuf::from(h).join(".inference-console").join("console.yaml"))
}

impl ConsoleConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist and parse. The implicit user file is
    /// optional; if it is unreadable or malformed it is skipped with a
    /// warning.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::from_path(path)?,
            None => match user_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_path(&path).unwrap_or_else(|e| {
                    tracing::warn!("ignoring user config: {e}");
                    Self::default()
                }),
                None => Self::default(),
            },
        };

        let config = config.with_env_key(std::env::var("ANTHROPIC_API_KEY").ok());
        config.validate()?;
        Ok(config)
    }

    /// Read and parse one YAML file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fill a missing provider key from the environment value.
    pub fn with_env_key(mut self, env_key: Option<String>) -> Self {
        if self.provider.api_key.is_none() {
            self.provider.api_key = env_key.filter(|k| !k.trim().is_empty());
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lifecycle.initial_nodes == 0 {
            return Err(ConfigError::Invalid(
                "lifecycle.initial_nodes must be at least 1".into(),
            ));
        }
        if self.lifecycle.scale_delta == 0 {
            return Err(ConfigError::Invalid(
                "lifecycle.scale_delta must be at least 1".into(),
            ));
        }
        if self.provider.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "provider.max_tokens must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Build the catalog this config describes.
    pub fn build_catalog(&self) -> Result<Catalog, ConfigError> {
        if self.catalog.is_empty() {
            Ok(Catalog::builtin())
        } else {
            Ok(Catalog::new(self.catalog.clone())?)
        }
    }
}
