//! Error types and handling for the relay server.
//!
//! [`AppError`] distinguishes validation, upstream and internal failures and
//! maps each one to the same status code on every endpoint. The legacy
//! conversion in [`AppError::into_legacy_response`] reproduces the historical
//! per-endpoint failure shapes for callers that opted into them.

use crate::core::error_types::{
    ERROR_TYPE_CONFIGURATION, ERROR_TYPE_INTERNAL, ERROR_TYPE_INVALID_REQUEST, ERROR_TYPE_TIMEOUT,
    ERROR_TYPE_UPSTREAM, ERROR_TYPE_VALIDATION, LEGACY_IMAGE_FAILURE_MESSAGE,
};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Client sent a body that does not match the request schema
    #[error("Validation error: {0}")]
    Validation(String),

    /// Body could not be read or was not sent as JSON
    #[error("Invalid request body: {message}")]
    InvalidBody { status: StatusCode, message: String },

    /// Provider rejected the call or answered with something unusable
    #[error("Upstream error from {provider}: {message}")]
    Upstream {
        provider: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// Transport-level errors from the reqwest client
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Provider credential was not configured at startup
    #[error("Missing credential: {0} is not configured")]
    MissingCredential(&'static str),

    /// Generic internal server errors with custom message
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Relay endpoint an error was raised on, used for legacy error shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEndpoint {
    Messages,
    Generate,
}

impl AppError {
    /// Status code and `type` label for the typed error envelope.
    pub fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, ERROR_TYPE_VALIDATION),
            AppError::InvalidBody { status, .. } => (*status, ERROR_TYPE_INVALID_REQUEST),
            AppError::Upstream { .. } => (StatusCode::BAD_GATEWAY, ERROR_TYPE_UPSTREAM),
            AppError::Request(e) if e.is_timeout() => {
                (StatusCode::GATEWAY_TIMEOUT, ERROR_TYPE_TIMEOUT)
            }
            AppError::Request(_) => (StatusCode::BAD_GATEWAY, ERROR_TYPE_UPSTREAM),
            AppError::MissingCredential(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ERROR_TYPE_CONFIGURATION)
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ERROR_TYPE_INTERNAL),
        }
    }

    /// Whether the caller's request was rejected before any relay ran.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::Validation(_) | AppError::InvalidBody { .. })
    }

    /// Historical failure shapes: `/messages` answers 500 with the error
    /// string as `detail`, `/generate` answers 200 with an `error` message.
    /// Rejected request bodies keep their typed response on both endpoints.
    pub fn into_legacy_response(self, endpoint: RelayEndpoint) -> Response {
        if self.is_client_error() {
            return self.into_response();
        }
        match endpoint {
            RelayEndpoint::Messages => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": self.to_string() })),
            )
                .into_response(),
            RelayEndpoint::Generate => (
                StatusCode::OK,
                Json(json!({ "error": LEGACY_IMAGE_FAILURE_MESSAGE })),
            )
                .into_response(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                AppError::Validation(rejection.body_text())
            }
            other => AppError::InvalidBody {
                status: other.status(),
                message: other.body_text(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();
        let body = Json(json!({
            "detail": self.to_string(),
            "type": error_type,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
