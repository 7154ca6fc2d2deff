//! Core data types exchanged with clients and upstream services.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Chest pathology classes in the order the classifier emits scores.
///
/// Scores are zipped to names positionally, so this order is load-bearing.
pub const CLASS_NAMES: [&str; 14] = [
    "Atelectasis",
    "Consolidation",
    "Infiltration",
    "Pneumothorax",
    "Edema",
    "Emphysema",
    "Fibrosis",
    "Effusion",
    "Pneumonia",
    "Pleural_Thickening",
    "Cardiomegaly",
    "Nodule",
    "Mass",
    "Hernia",
];

/// Number of condition classes the classifier scores.
pub const N_CLASSES: usize = CLASS_NAMES.len();

/// Check that `labels` matches [`CLASS_NAMES`] exactly, in order.
pub fn check_class_order<S: AsRef<str>>(labels: &[S]) -> Result<(), ConfigError> {
    for (index, expected) in CLASS_NAMES.iter().enumerate() {
        let actual = labels.get(index).map(|s| s.as_ref()).unwrap_or("<missing>");
        if actual != *expected {
            return Err(ConfigError::ClassOrderMismatch {
                index,
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
    }
    if labels.len() > N_CLASSES {
        return Err(ConfigError::ClassOrderMismatch {
            index: N_CLASSES,
            expected: "<end of list>".to_string(),
            actual: labels[N_CLASSES].as_ref().to_string(),
        });
    }
    Ok(())
}

/// One user/assistant exchange in a conversation.
///
/// `assistant` is absent for the most recent user message awaiting a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant: Option<String>,
}

impl ConversationTurn {
    /// A turn that still awaits the assistant's reply.
    pub fn ask(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: None,
        }
    }

    /// A completed exchange from chat history.
    pub fn answered(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: Some(assistant.into()),
        }
    }
}

/// Score for a single condition class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassScore {
    /// Condition name from [`CLASS_NAMES`]
    pub label: String,

    /// Pre-activation model output, kept for diagnostics
    pub raw_score: f32,

    /// Sigmoid of `raw_score`, in [0, 1]
    pub normalized_score: f32,
}

/// Classifier output for one input image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub image_url: String,

    /// One entry per class, in [`CLASS_NAMES`] order
    pub predictions: Vec<ClassScore>,

    /// Wall-clock time of the classify call only (fetch excluded)
    pub elapsed_seconds: f64,
}

/// Assistant reply from the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnswer {
    /// Reply text with surrounding whitespace trimmed
    pub text: String,

    /// Upstream safety metadata, passed through unmodified
    pub safety_ratings: serde_json::Value,

    /// Round-trip latency of the chat call
    pub elapsed_seconds: f64,
}

/// Generated overview for one requested condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDetail {
    pub condition: String,
    pub details: String,
}

/// Full report for a set of positive conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalReport {
    pub status: String,

    /// Overall impression referencing every requested condition
    pub summary: String,

    /// Per-condition details, in request order
    pub report: Vec<ConditionDetail>,

    /// Completion time (RFC 3339)
    pub timestamp: String,

    /// Wall time of the whole generation, not the sum of call latencies
    pub total_elapsed_seconds: f64,
}

/// Body of a predict request. An empty list is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub image_urls: Vec<String>,
}

/// Body of a report request. Duplicate conditions are processed twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportRequest {
    pub conditions: Vec<String>,
}

/// Success envelope for the predict endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub status: String,
    pub data: Vec<ClassificationResult>,
}

impl PredictionResponse {
    pub fn success(data: Vec<ClassificationResult>) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}
