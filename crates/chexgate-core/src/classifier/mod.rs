//! Remote chest X-ray classifier.
//!
//! The model itself lives behind an HTTP endpoint. This module defines the
//! client trait the orchestrator calls, the HTTP implementation, and the
//! positional zip of raw scores onto [`CLASS_NAMES`].

mod http;

pub use http::HttpClassifier;

use crate::error::{GatewayError, Result, Upstream};
use crate::math::sigmoid;
use crate::pipeline::PreparedImage;
use crate::types::{ClassScore, CLASS_NAMES, N_CLASSES};
use async_trait::async_trait;
use std::time::Duration;

/// One image ready for classification.
#[derive(Debug, Clone)]
pub struct ClassifierInput {
    /// Client-supplied URL (also forwarded so the upstream can log or refetch)
    pub image_url: String,
    pub image: PreparedImage,
}

/// Trait that all classifier backends implement.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Score one image against every condition class, in [`CLASS_NAMES`] order.
    async fn classify(&self, input: &ClassifierInput) -> Result<Vec<ClassScore>>;

    /// Class labels the backend reports, in output order, if it exposes them.
    async fn labels(&self) -> Result<Option<Vec<String>>> {
        Ok(None)
    }

    /// Per-request timeout for this backend.
    fn timeout(&self) -> Duration;
}

/// Zip raw pre-activation scores onto the canonical class names.
///
/// Anything other than exactly [`N_CLASSES`] finite scores means the
/// upstream's output no longer lines up with the class list.
pub fn scores_from_logits(logits: &[f32]) -> Result<Vec<ClassScore>> {
    if logits.len() != N_CLASSES {
        return Err(GatewayError::UpstreamParse {
            service: Upstream::Classifier,
            message: format!("expected {N_CLASSES} scores, got {}", logits.len()),
        });
    }
    if let Some(pos) = logits.iter().position(|x| !x.is_finite()) {
        return Err(GatewayError::UpstreamParse {
            service: Upstream::Classifier,
            message: format!("non-finite score for {}", CLASS_NAMES[pos]),
        });
    }

    Ok(CLASS_NAMES
        .iter()
        .zip(logits)
        .map(|(label, &raw)| ClassScore {
            label: label.to_string(),
            raw_score: raw,
            normalized_score: sigmoid(raw),
        })
        .collect())
}
