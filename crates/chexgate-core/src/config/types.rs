//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port (overridden by `PORT`)
    pub port: u16,

    /// Origins allowed by CORS (`FRONTEND_URL` / `BACKEND_URL` are appended)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:5000".to_string(),
            ],
        }
    }
}

/// Remote classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Prediction endpoint (POST); `CLASSIFIER_URL` overrides, supports ${ENV_VAR} syntax
    pub endpoint: String,

    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,

    /// Check `{endpoint}/labels` at startup and refuse to serve on mismatch
    pub verify_labels: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:7860/api/classify".to_string(),
            timeout_ms: 30_000,
            verify_labels: false,
        }
    }
}

/// Remote chat endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// API base URL; `CHAT_BASE_URL` overrides, supports ${ENV_VAR} syntax
    pub base_url: String,

    /// Model resource name (e.g. `tunedModels/...` or `models/...`)
    pub model: String,

    /// Billing project sent as `x-goog-user-project` (supports ${ENV_VAR} syntax)
    pub project: String,

    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "tunedModels/book2modifiedanswers-6vt4z4xscfbz".to_string(),
            project: "${GOOGLE_CLOUD_PROJECT}".to_string(),
            timeout_ms: 60_000,
        }
    }
}

/// Service-identity credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Base64-encoded service-account JSON key (supports ${ENV_VAR} syntax)
    pub service_account_json: String,

    /// Fixed bearer token; when set, no credential exchange happens
    pub static_token: String,

    /// OAuth scopes requested for the access token
    pub scopes: Vec<String>,

    /// Refresh this many seconds before the token actually expires
    pub refresh_skew_secs: u64,

    /// Token exchange timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            service_account_json: "${GOOGLE_APPLICATION_CREDENTIALS_JSON}".to_string(),
            static_token: String::new(),
            scopes: vec![
                "https://www.googleapis.com/auth/cloud-platform".to_string(),
                "https://www.googleapis.com/auth/generative-language".to_string(),
            ],
            refresh_skew_secs: 60,
            timeout_ms: 15_000,
        }
    }
}

/// Image fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-image GET timeout in milliseconds
    pub timeout_ms: u64,

    /// Maximum accepted image payload in bytes
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Maximum image URLs accepted in one predict request
    pub max_images_per_request: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_dimension: 8192,
            decode_timeout_ms: 5000,
            max_images_per_request: 32,
        }
    }
}

/// Fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum concurrent per-item upstream calls within one request
    pub max_parallel: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { max_parallel: 8 }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
