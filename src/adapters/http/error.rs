use crate::domain::error::{PipelineError, Stage};
use crate::domain::path_safety::PathSafetyError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// JSON error response: `{"error": .., "stage": .., "reason": ..}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub stage: Option<Stage>,
    pub reason: Option<&'static str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            stage: None,
            reason: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl ToString) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
            stage: Some(err.stage()),
            reason: Some(err.reason()),
        }
    }
}

impl From<PathSafetyError> for ApiError {
    fn from(err: PathSafetyError) -> Self {
        let status = match err {
            PathSafetyError::NotAllowed(_) | PathSafetyError::Escapes(_) => StatusCode::FORBIDDEN,
            PathSafetyError::NotFound(_) => StatusCode::NOT_FOUND,
            PathSafetyError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "stage": self.stage,
            "reason": self.reason,
        }));
        (self.status, body).into_response()
    }
}
