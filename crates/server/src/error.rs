use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use securevote::{CoordinatorError, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Coordinator(CoordinatorError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Coordinator(err) => match err.kind() {
                ErrorKind::Input => StatusCode::BAD_REQUEST,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Storage | ErrorKind::Configuration | ErrorKind::Internal => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::Forbidden(_) => "FORBIDDEN",
            ServerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::NotFound => "NOT_FOUND",
            ServerError::Coordinator(err) => match err {
                CoordinatorError::NoFaceDetected => "NO_FACE_DETECTED",
                CoordinatorError::InvalidImage(_) => "INVALID_IMAGE",
                CoordinatorError::InvalidInput(_) => "INVALID_INPUT",
                CoordinatorError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
                CoordinatorError::UnknownVoter(_) => "UNKNOWN_VOTER",
                CoordinatorError::NotFound(_) => "VOTER_NOT_FOUND",
                CoordinatorError::NameTaken(_) => "NAME_TAKEN",
                CoordinatorError::DuplicateIdentity { .. } => "DUPLICATE_IDENTITY",
                CoordinatorError::AlreadyVoted(_) => "ALREADY_VOTED",
                CoordinatorError::Storage(_) => "STORAGE_ERROR",
                CoordinatorError::Configuration(_) => "CONFIG_ERROR",
                CoordinatorError::Internal(_) => "INTERNAL_ERROR",
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}
