//! Error types for the chexgate gateway.
//!
//! Errors are organized by who is at fault so the HTTP surface can tell a
//! bad client input apart from an unreachable or misbehaving upstream.

use thiserror::Error;

/// Top-level error type for gateway operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Identity refresh against the token endpoint failed
    #[error("Credential unavailable: {0}")]
    Credential(String),

    /// Network failure reaching the classifier or chat endpoint
    #[error("Error connecting to {service} for {item}: {message}")]
    UpstreamConnection {
        service: Upstream,
        item: String,
        message: String,
    },

    /// Upstream answered with a non-success status
    #[error("Error from {service} (HTTP {status}): {body}")]
    UpstreamStatus {
        service: Upstream,
        status: u16,
        body: String,
    },

    /// Upstream answered, but the payload did not match the expected shape
    #[error("Error parsing {service} response: {message}")]
    UpstreamParse { service: Upstream, message: String },

    /// Operation exceeded its time bound
    #[error("Timeout in {stage} stage for {item} after {timeout_ms}ms")]
    Timeout {
        stage: Stage,
        item: String,
        timeout_ms: u64,
    },

    /// Client-supplied image URL could not be retrieved
    #[error("Failed to fetch image {url}: {message}")]
    ImageFetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// Client-supplied image payload is not a decodable image
    #[error("Invalid image data at {url}: {message}")]
    ImageDecode { url: String, message: String },

    /// Request body failed validation before any remote call
    #[error("{0}")]
    Validation(String),

    /// A fan-out task failed outside its own error handling (panic, closed limiter)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Remote collaborators the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Classifier,
    Chat,
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Upstream::Classifier => f.write_str("classifier"),
            Upstream::Chat => f.write_str("chat endpoint"),
        }
    }
}

/// Per-item stages that carry their own time bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Decode,
    Classify,
    Chat,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Fetch => f.write_str("fetch"),
            Stage::Decode => f.write_str("decode"),
            Stage::Classify => f.write_str("classify"),
            Stage::Chat => f.write_str("chat"),
        }
    }
}

impl GatewayError {
    /// HTTP status code this error is surfaced with.
    ///
    /// Bad client input maps to 400, unreachable upstreams to 502, upstream
    /// status errors echo the upstream code, timeouts to 504, and anything
    /// the gateway itself could not make sense of to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Validation(_)
            | GatewayError::ImageFetch { .. }
            | GatewayError::ImageDecode { .. } => 400,
            // The image URL is client-supplied, so a slow host is their problem
            GatewayError::Timeout {
                stage: Stage::Fetch | Stage::Decode,
                ..
            } => 400,
            GatewayError::Timeout { .. } => 504,
            GatewayError::UpstreamConnection { .. } => 502,
            GatewayError::UpstreamStatus { status, .. } => {
                if (400..=599).contains(status) {
                    *status
                } else {
                    502
                }
            }
            GatewayError::Credential(_)
            | GatewayError::UpstreamParse { .. }
            | GatewayError::Config(_)
            | GatewayError::Internal(_) => 500,
        }
    }

    /// Whether the caller (not the gateway or an upstream) is at fault.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
            && !matches!(self, GatewayError::UpstreamStatus { .. })
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Classifier label order does not match the canonical class list
    #[error("Classifier class order mismatch at index {index}: expected {expected}, got {actual}")]
    ClassOrderMismatch {
        index: usize,
        expected: String,
        actual: String,
    },
}

/// Convenience type alias for gateway results.
pub type Result<T> = std::result::Result<T, GatewayError>;
