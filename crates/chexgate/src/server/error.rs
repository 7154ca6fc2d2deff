//! HTTP error envelope.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chexgate_core::GatewayError;
use serde::Serialize;

/// Error body returned by every endpoint: `{"status_code": 400, "detail": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status_code: u16,
    pub detail: String,
}

/// An error ready to be turned into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

/// Caller mistakes are warnings; upstream and internal failures are errors,
/// including relayed upstream 4xx codes.
fn log_level(err: &GatewayError) -> tracing::Level {
    if err.is_client_error() {
        tracing::Level::WARN
    } else {
        tracing::Level::ERROR
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if log_level(&err) == tracing::Level::WARN {
            tracing::warn!(status = status.as_u16(), "Request rejected: {err}");
        } else {
            tracing::error!(status = status.as_u16(), "Request failed: {err}");
        }
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Every body problem is reported as unprocessable, whatever axum's own code
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status_code: self.status.as_u16(),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}
