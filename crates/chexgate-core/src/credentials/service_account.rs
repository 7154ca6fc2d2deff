//! Service-account credential exchange (OAuth 2.0 JWT bearer grant).

use super::{AccessToken, TokenSource};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Assertions are valid for at most one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a service-account JSON key the exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parse a key from its base64-encoded JSON form.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| GatewayError::Credential(format!("Service account key is not base64: {e}")))?;
        serde_json::from_slice(&decoded)
            .map_err(|e| GatewayError::Credential(format!("Invalid service account key: {e}")))
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Exchanges a signed service-account assertion for an access token.
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    scopes: Vec<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, scopes: Vec<String>, timeout: Duration) -> Self {
        Self {
            key,
            scopes,
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Sign the RS256 JWT bearer assertion.
    fn assertion(&self) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: self.scopes.join(" "),
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| GatewayError::Credential(format!("Invalid service account private key: {e}")))?;
        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| GatewayError::Credential(format!("Failed to sign assertion: {e}")))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    fn name(&self) -> &str {
        "service-account"
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let assertion = self.assertion()?;
        let requested_at = Instant::now();

        let resp = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::Credential(format!("Token exchange failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Credential(format!(
                "Token endpoint HTTP {status}: {text}"
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Credential(format!("Failed to parse token response: {e}")))?;

        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "Obtained access token"
        );

        Ok(AccessToken {
            token: token.access_token,
            expires_at: Some(requested_at + Duration::from_secs(token.expires_in)),
        })
    }
}
