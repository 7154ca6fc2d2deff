//! Chexgate Core - chest X-ray classification and reporting gateway library.
//!
//! Chexgate sits between a web client and two remote services: an image
//! classifier that scores chest radiographs against fourteen findings, and a
//! generative chat endpoint that answers questions and writes reports.
//!
//! # Architecture
//!
//! ```text
//! URLs → Fetch → Decode/normalize → Classify (remote logits) → Sigmoid → JSON
//! Conditions → Summary (chat) → Per-condition details (chat, concurrent) → Report
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use chexgate_core::{Config, Gateway};
//!
//! #[tokio::main]
//! async fn main() -> chexgate_core::Result<()> {
//!     let config = Config::load()?;
//!     let gateway = Gateway::new(config)?;
//!
//!     let results = gateway
//!         .orchestrator()
//!         .batch_classify(&["https://example.com/cxr.png".to_string()])
//!         .await?;
//!     println!("{:?}", results[0].predictions);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod classifier;
pub mod config;
pub mod credentials;
pub mod error;
pub mod llm;
pub mod math;
pub mod orchestrator;
pub mod pipeline;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{resolve_env_var, Config};
pub use credentials::CredentialProvider;
pub use error::{ConfigError, GatewayError, Result, Stage, Upstream};
pub use orchestrator::{settle_all, Orchestrator, OrchestratorOptions};
pub use types::{
    ChatAnswer, ClassScore, ClassificationResult, ConditionDetail, ConversationTurn,
    MedicalReport, PredictionRequest, PredictionResponse, ReportRequest, CLASS_NAMES,
};

use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Gateway - the main entry point, owning the configured orchestrator.
pub struct Gateway {
    config: Config,
    orchestrator: Arc<Orchestrator>,
}

impl Gateway {
    /// Build a gateway with the real HTTP fetcher, classifier and chat client.
    ///
    /// Fails if no credential source is configured.
    pub fn new(config: Config) -> Result<Self> {
        tracing::debug!("Initializing chexgate v{}", VERSION);

        let credentials = Arc::new(CredentialProvider::from_config(
            &config.credentials,
            resolve_env_var(&config.chat.project),
        )?);

        let orchestrator = Orchestrator::new(
            Arc::new(pipeline::HttpImageFetcher::new(config.fetch.clone())),
            pipeline::ImageDecoder::new(config.limits.clone()),
            Arc::new(classifier::HttpClassifier::new(&config.classifier)),
            Arc::new(llm::GeminiChatClient::new(&config.chat, credentials.clone())),
            OrchestratorOptions::from_config(&config),
        )
        .with_credentials(credentials);

        Ok(Self::from_parts(config, orchestrator))
    }

    /// Assemble a gateway around an already-built orchestrator.
    pub fn from_parts(config: Config, orchestrator: Orchestrator) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the orchestrator.
    pub fn orchestrator(&self) -> Arc<Orchestrator> {
        self.orchestrator.clone()
    }

    /// Run the optional startup check of the classifier's label order.
    pub async fn verify(&self) -> Result<()> {
        if self.config.classifier.verify_labels {
            self.orchestrator.verify_classifier_labels().await
        } else {
            Ok(())
        }
    }
}
