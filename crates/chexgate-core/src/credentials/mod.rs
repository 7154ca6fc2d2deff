//! Bearer credentials for the chat endpoint.
//!
//! A [`CredentialProvider`] caches one access token for the whole process and
//! refreshes it lazily. Refresh is single-flight: concurrent callers that find
//! the token expired wait on the same in-flight exchange instead of each
//! issuing their own.

mod service_account;

pub use service_account::{ServiceAccountKey, ServiceAccountTokenSource};

use crate::config::{resolve_env_var, CredentialsConfig};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// An access token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    /// `None` for tokens that never expire (static tokens)
    pub expires_at: Option<Instant>,
}

impl AccessToken {
    /// Whether the token is still usable `skew` from now.
    pub fn is_fresh(&self, skew: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() + skew < expires_at,
            None => true,
        }
    }
}

/// Headers attached to every chat endpoint call.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthHeaders {
    /// `Bearer <token>`
    pub authorization: String,
    pub content_type: String,
    /// Value for `x-goog-user-project`, if a billing project is configured
    pub project: Option<String>,
}

/// Source of fresh access tokens (identity provider exchange, fixed token, ...).
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Obtain a new access token. Always performs the exchange.
    async fn fetch_token(&self) -> Result<AccessToken>;
}

/// A fixed bearer token, for local development against a proxy.
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        Ok(AccessToken {
            token: self.token.clone(),
            expires_at: None,
        })
    }
}

/// Process-wide credential holder with lazy, single-flight refresh.
pub struct CredentialProvider {
    source: Arc<dyn TokenSource>,
    project: Option<String>,
    refresh_skew: Duration,
    cached: Mutex<Option<AccessToken>>,
}

impl CredentialProvider {
    pub fn new(source: Arc<dyn TokenSource>, project: Option<String>, refresh_skew: Duration) -> Self {
        Self {
            source,
            project,
            refresh_skew,
            cached: Mutex::new(None),
        }
    }

    /// Build the provider described by the credentials config.
    ///
    /// A static token wins over the service-account key. The billing project
    /// falls back to the key's own `project_id` when not configured.
    pub fn from_config(config: &CredentialsConfig, project: Option<String>) -> Result<Self> {
        let skew = Duration::from_secs(config.refresh_skew_secs);

        if let Some(token) = resolve_env_var(&config.static_token) {
            tracing::info!("Using static bearer token for chat endpoint");
            return Ok(Self::new(
                Arc::new(StaticTokenSource::new(token)),
                project,
                skew,
            ));
        }

        let encoded = resolve_env_var(&config.service_account_json).ok_or_else(|| {
            GatewayError::Credential(
                "Service account key not set. Set GOOGLE_APPLICATION_CREDENTIALS_JSON env var."
                    .to_string(),
            )
        })?;
        let key = ServiceAccountKey::from_base64(&encoded)?;
        let project = project.or_else(|| key.project_id.clone());
        let source = ServiceAccountTokenSource::new(
            key,
            config.scopes.clone(),
            Duration::from_millis(config.timeout_ms),
        );
        Ok(Self::new(Arc::new(source), project, skew))
    }

    /// Return a valid access token, refreshing first if needed.
    ///
    /// A fresh cached token is returned without touching the token source.
    pub async fn access_token(&self) -> Result<String> {
        // Held across the exchange so concurrent callers share one refresh
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(self.refresh_skew) {
                return Ok(token.token.clone());
            }
        }

        tracing::debug!(source = self.source.name(), "Refreshing access token");
        let fresh = self.source.fetch_token().await.map_err(|e| match e {
            GatewayError::Credential(_) => e,
            other => GatewayError::Credential(other.to_string()),
        })?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Cheap idempotent check-and-refresh, run at each orchestration entry point.
    pub async fn refresh(&self) -> Result<()> {
        self.access_token().await.map(|_| ())
    }

    /// Headers for an authenticated chat endpoint call.
    pub async fn auth_headers(&self) -> Result<AuthHeaders> {
        let token = self.access_token().await?;
        Ok(AuthHeaders {
            authorization: format!("Bearer {token}"),
            content_type: "application/json".to_string(),
            project: self.project.clone(),
        })
    }
}
