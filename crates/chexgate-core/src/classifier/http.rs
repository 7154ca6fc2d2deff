//! HTTP classifier backend.
//!
//! POSTs the normalized image (base64) plus its source URL as JSON and reads
//! back one raw score per class.

use super::{scores_from_logits, Classifier, ClassifierInput};
use crate::config::ClassifierConfig;
use crate::error::{GatewayError, Result, Stage, Upstream};
use crate::types::{check_class_order, ClassScore};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Classifier reached over HTTP.
pub struct HttpClassifier {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    fn transport_error(&self, item: &str, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout {
                stage: Stage::Classify,
                item: item.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            GatewayError::UpstreamConnection {
                service: Upstream::Classifier,
                item: item.to_string(),
                message: e.to_string(),
            }
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    image_url: &'a str,
    image: EncodedImage<'a>,
}

#[derive(Serialize)]
struct EncodedImage<'a> {
    data: String,
    media_type: &'a str,
}

// --- Response types ---

#[derive(Deserialize)]
struct ClassifyResponse {
    logits: Vec<f32>,
    #[serde(default)]
    labels: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct LabelsResponse {
    labels: Vec<String>,
}

/// Parse a classify response body into class scores.
fn parse_classify_response(body: &[u8]) -> Result<Vec<ClassScore>> {
    let resp: ClassifyResponse =
        serde_json::from_slice(body).map_err(|e| GatewayError::UpstreamParse {
            service: Upstream::Classifier,
            message: e.to_string(),
        })?;

    // Labels are optional, but when present they must line up
    if let Some(labels) = &resp.labels {
        check_class_order(labels).map_err(|e| GatewayError::UpstreamParse {
            service: Upstream::Classifier,
            message: e.to_string(),
        })?;
    }
    scores_from_logits(&resp.logits)
}

#[async_trait]
impl Classifier for HttpClassifier {
    fn name(&self) -> &str {
        "http"
    }

    async fn classify(&self, input: &ClassifierInput) -> Result<Vec<ClassScore>> {
        let body = ClassifyRequest {
            image_url: &input.image_url,
            image: EncodedImage {
                data: base64::engine::general_purpose::STANDARD.encode(&input.image.data),
                media_type: input.image.media_type,
            },
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(&input.image_url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::UpstreamStatus {
                service: Upstream::Classifier,
                status: status.as_u16(),
                body: text,
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| self.transport_error(&input.image_url, e))?;
        parse_classify_response(&bytes)
    }

    async fn labels(&self) -> Result<Option<Vec<String>>> {
        let url = format!("{}/labels", self.endpoint);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error("labels", e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::UpstreamStatus {
                service: Upstream::Classifier,
                status: status.as_u16(),
                body: text,
            });
        }

        let labels: LabelsResponse = resp.json().await.map_err(|e| GatewayError::UpstreamParse {
            service: Upstream::Classifier,
            message: format!("labels: {e}"),
        })?;
        Ok(Some(labels.labels))
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
