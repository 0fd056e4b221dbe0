use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("invalid {field}: {message}")]
    InvalidArgument { field: &'static str, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("deadline elapsed before commit")]
    TimedOut,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Database(sqlx::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_argument(field: &'static str, message: impl Into<String>) -> Self {
        AppError::InvalidArgument {
            field,
            message: message.into(),
        }
    }

    /// Transient store failures are retryable by the caller; everything else
    /// is an internal database error.
    pub fn from_store(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                AppError::Unavailable(err.to_string())
            }
            other => AppError::Database(other),
        }
    }

    /// Stable identifier for the error body, independent of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidArgument { .. } => "invalid_argument",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::TimedOut => "timed_out",
            AppError::Unavailable(_) => "unavailable",
            AppError::Config(_)
            | AppError::Internal(_)
            | AppError::Database(_)
            | AppError::Io(_)
            | AppError::Other(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TimedOut => StatusCode::REQUEST_TIMEOUT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_)
            | AppError::Internal(_)
            | AppError::Database(_)
            | AppError::Io(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "request failed");
        }

        // Store-internal details stay in the log line above, never in the body.
        let message = match &self {
            AppError::Database(_) | AppError::Io(_) | AppError::Other(_) => {
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = match &self {
            AppError::InvalidArgument { field, .. } => json!({
                "error": self.kind(),
                "field": field,
                "message": message,
            }),
            _ => json!({
                "error": self.kind(),
                "message": message,
            }),
        };

        (status, Json(body)).into_response()
    }
}
