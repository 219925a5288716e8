//! Error types and response envelopes for the API.

use alert_engine::EngineError;
use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failure reported by the alert engine.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Storage failure outside the engine.
    #[error("Database error: {0}")]
    Database(#[from] database::DatabaseError),

    /// Missing or malformed identity header.
    #[error("Missing or invalid user identity")]
    Unauthorized,

    /// Malformed request body.
    #[error("{0}")]
    Validation(String),

    /// Trigger suppressed with no alert to return.
    #[error("{0}")]
    OnCooldown(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Engine(EngineError::NotFound { .. }) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Engine(EngineError::AlreadyTerminal { .. }) => {
                (StatusCode::CONFLICT, "ALREADY_TERMINAL")
            }
            ApiError::Engine(EngineError::Validation(_)) | ApiError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::Engine(EngineError::Database(_)) | ApiError::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::OnCooldown(_) => (StatusCode::CONFLICT, "ON_COOLDOWN"),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(code, error = %self, "Request rejected");
            self.to_string()
        };

        let body = ErrorEnvelope {
            success: false,
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// JSON body extractor that reports malformed bodies as `VALIDATION_ERROR`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Result type for API handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
