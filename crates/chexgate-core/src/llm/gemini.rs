//! Gemini chat backend using the `generateContent` API.
//!
//! Sends the flattened conversation as one content entry of text parts,
//! authenticated with the shared bearer credential.

use super::provider::{ChatBackend, ChatRequest};
use crate::config::ChatConfig;
use crate::credentials::CredentialProvider;
use crate::error::{GatewayError, Result, Stage, Upstream};
use crate::types::ChatAnswer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Gemini provider for tuned or base models.
pub struct GeminiChatClient {
    url: String,
    client: reqwest::Client,
    credentials: Arc<CredentialProvider>,
    timeout: Duration,
}

impl GeminiChatClient {
    pub fn new(config: &ChatConfig, credentials: Arc<CredentialProvider>) -> Self {
        let url = format!(
            "{}/v1beta/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model.trim_matches('/')
        );
        Self {
            url,
            client: reqwest::Client::new(),
            credentials,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

// --- Response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    safety_ratings: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn parse_error(message: impl Into<String>) -> GatewayError {
    GatewayError::UpstreamParse {
        service: Upstream::Chat,
        message: message.into(),
    }
}

/// Extract the reply text and safety ratings from a response body.
///
/// The reply is the last part of the first candidate, trimmed.
pub(crate) fn parse_generate_response(body: &[u8]) -> Result<(String, serde_json::Value)> {
    let resp: GenerateContentResponse =
        serde_json::from_slice(body).map_err(|e| parse_error(e.to_string()))?;

    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| parse_error("response has no candidates"))?;
    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().last())
        .and_then(|p| p.text)
        .ok_or_else(|| parse_error("first candidate has no text part"))?;
    let safety_ratings = candidate
        .safety_ratings
        .ok_or_else(|| parse_error("first candidate has no safetyRatings"))?;

    Ok((text.trim().to_string(), safety_ratings))
}

#[async_trait]
impl ChatBackend for GeminiChatClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn converse(&self, request: &ChatRequest) -> Result<ChatAnswer> {
        let headers = self.credentials.auth_headers().await?;
        let start = Instant::now();

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: request
                    .parts()
                    .into_iter()
                    .map(|text| RequestPart { text })
                    .collect(),
            }],
        };

        let mut builder = self
            .client
            .post(&self.url)
            .header("Authorization", &headers.authorization)
            .header("Content-Type", &headers.content_type);
        if let Some(project) = &headers.project {
            builder = builder.header("x-goog-user-project", project);
        }

        let resp = builder
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout {
                        stage: Stage::Chat,
                        item: request.label.clone(),
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    GatewayError::UpstreamConnection {
                        service: Upstream::Chat,
                        item: request.label.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::UpstreamStatus {
                service: Upstream::Chat,
                status: status.as_u16(),
                body: text,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| GatewayError::UpstreamConnection {
            service: Upstream::Chat,
            item: request.label.clone(),
            message: format!("body read failed: {e}"),
        })?;
        let (text, safety_ratings) = parse_generate_response(&bytes)?;

        Ok(ChatAnswer {
            text,
            safety_ratings,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
