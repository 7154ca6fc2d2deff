//! Configuration management for chexgate.
//!
//! Configuration is loaded from `config.toml` in the platform config
//! directory with sensible defaults, then overlaid with the handful of
//! environment variables deployments set (`PORT`, `FRONTEND_URL`, ...).

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for chexgate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Remote classifier settings
    pub classifier: ClassifierConfig,

    /// Remote chat endpoint settings
    pub chat: ChatConfig,

    /// Service-identity credential settings
    pub credentials: CredentialsConfig,

    /// Image fetch settings
    pub fetch: FetchConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Fan-out settings
    pub orchestrator: OrchestratorConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration (plus environment overrides) if the
    /// file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            let mut config = Self::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.chexgate.chexgate/config.toml
    /// - Linux: ~/.config/chexgate/config.toml
    ///
    /// Falls back to ~/.chexgate/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "chexgate", "chexgate")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".chexgate").join("config.toml")
            })
    }

    /// Overlay deployment environment variables onto file/default values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Overlay values from `lookup`, which maps a variable name to its value.
    ///
    /// `CLASSIFIER_URL` and `CHAT_BASE_URL` replace the upstream addresses
    /// outright; otherwise `${VAR}` references in them are expanded.
    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
        for var in ["FRONTEND_URL", "BACKEND_URL"] {
            if let Some(origin) = lookup(var) {
                let origin = origin.trim().trim_end_matches('/').to_string();
                if !origin.is_empty() && !self.server.cors_origins.contains(&origin) {
                    self.server.cors_origins.push(origin);
                }
            }
        }

        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        self.classifier.endpoint = match non_empty("CLASSIFIER_URL") {
            Some(url) => url.trim().to_string(),
            None => expand_with(&self.classifier.endpoint, &lookup),
        };
        self.chat.base_url = match non_empty("CHAT_BASE_URL") {
            Some(url) => url.trim().to_string(),
            None => expand_with(&self.chat.base_url, &lookup),
        };
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Expand `${VAR}` references, leaving unknown ones in place.
fn expand_with<F>(value: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    shellexpand::env_with_context_no_errors(value, |name| lookup(name)).into_owned()
}

/// Resolve `${ENV_VAR}` references in config strings.
///
/// Plain values pass through; empty values and unset variables yield `None`.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let expanded = shellexpand::env(value).ok()?;
        if expanded.is_empty() {
            None
        } else {
            Some(expanded.into_owned())
        }
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
