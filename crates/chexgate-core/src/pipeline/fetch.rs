//! Image retrieval from client-supplied URLs with time and size bounds.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::{GatewayError, Result, Stage};

/// Anything that can produce raw image bytes for a URL.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Retrieve the raw bytes behind `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Bounded-time HTTP GET fetcher.
pub struct HttpImageFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl HttpImageFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn timeout_error(&self, url: &str) -> GatewayError {
        GatewayError::Timeout {
            stage: Stage::Fetch,
            item: url.to_string(),
            timeout_ms: self.config.timeout_ms,
        }
    }
}

#[async_trait]
impl ImageSource for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let timeout = Duration::from_millis(self.config.timeout_ms);

        // One deadline covers connect, headers and body
        let download = async {
            let resp = self.client.get(url).send().await.map_err(|e| {
                if e.is_timeout() {
                    self.timeout_error(url)
                } else {
                    GatewayError::ImageFetch {
                        url: url.to_string(),
                        status: None,
                        message: format!("request failed: {e}"),
                    }
                }
            })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(GatewayError::ImageFetch {
                    url: url.to_string(),
                    status: Some(status.as_u16()),
                    message: format!("HTTP {status}"),
                });
            }

            if let Some(len) = resp.content_length() {
                if len > self.config.max_bytes {
                    return Err(too_large(url, self.config.max_bytes));
                }
            }

            let mut body = Vec::new();
            let mut stream = resp.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| GatewayError::ImageFetch {
                    url: url.to_string(),
                    status: Some(status.as_u16()),
                    message: format!("body read failed: {e}"),
                })?;
                if (body.len() + chunk.len()) as u64 > self.config.max_bytes {
                    return Err(too_large(url, self.config.max_bytes));
                }
                body.extend_from_slice(&chunk);
            }
            Ok(body)
        };

        match tokio::time::timeout(timeout, download).await {
            Ok(result) => result,
            Err(_) => Err(self.timeout_error(url)),
        }
    }
}

fn too_large(url: &str, max_bytes: u64) -> GatewayError {
    GatewayError::ImageFetch {
        url: url.to_string(),
        status: None,
        message: format!("image exceeds {max_bytes} bytes"),
    }
}
