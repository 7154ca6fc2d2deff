//! Endpoint handlers.
//!
//! Each handler validates the body shape, delegates to the orchestrator and
//! serializes the result. Errors go through [`ApiError`].

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chexgate_core::{
    ChatAnswer, ConversationTurn, MedicalReport, PredictionRequest, PredictionResponse,
    ReportRequest,
};
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the chexnet API server!" }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": chexgate_core::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `POST /model/api/v1/predict/`
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = body?;
    tracing::info!(images = request.image_urls.len(), "Predict request");

    let data = state
        .orchestrator
        .batch_classify(&request.image_urls)
        .await?;
    Ok(Json(PredictionResponse::success(data)))
}

/// `POST /api/v1/chatbot/chat/`
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<Vec<ConversationTurn>>, JsonRejection>,
) -> Result<Json<ChatAnswer>, ApiError> {
    let Json(turns) = body?;
    tracing::info!(turns = turns.len(), "Chat request");

    let answer = state.orchestrator.chat(turns).await?;
    Ok(Json(answer))
}

/// `POST /api/v1/chatbot/report/`
pub async fn report(
    State(state): State<AppState>,
    body: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Json<MedicalReport>, ApiError> {
    let Json(request) = body?;
    tracing::info!(conditions = ?request.conditions, "Report request");

    let report = state
        .orchestrator
        .generate_report(&request.conditions)
        .await?;
    Ok(Json(report))
}
