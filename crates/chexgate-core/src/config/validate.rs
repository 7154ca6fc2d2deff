//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

/// Upper bound on concurrent upstream calls per request.
pub(crate) const MAX_PARALLEL: usize = 256;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.orchestrator.max_parallel == 0 || self.orchestrator.max_parallel > MAX_PARALLEL {
            return Err(ConfigError::ValidationError(format!(
                "orchestrator.max_parallel must be between 1 and {MAX_PARALLEL}"
            )));
        }
        if self.classifier.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "classifier.timeout_ms must be > 0".into(),
            ));
        }
        if self.chat.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "chat.timeout_ms must be > 0".into(),
            ));
        }
        if self.fetch.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.timeout_ms must be > 0".into(),
            ));
        }
        if self.fetch.max_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.max_bytes must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.chat.base_url.trim().is_empty() || self.classifier.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "chat.base_url and classifier.endpoint must be set".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        for (key, url) in [
            ("chat.base_url", &self.chat.base_url),
            ("classifier.endpoint", &self.classifier.endpoint),
        ] {
            if url.contains("${") {
                return Err(ConfigError::ValidationError(format!(
                    "{key} references an unset environment variable: {url}"
                )));
            }
        }
        Ok(())
    }
}
