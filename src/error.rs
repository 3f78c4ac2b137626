// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::lifecycle::TransitionError;

/// Fallback shown when the backend gives no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors raised by the exam-attempt clients.
///
/// Every transport or decode failure is folded into one of these variants;
/// `message()` yields the text that should reach the user.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered 4xx/5xx.
    #[error("request failed ({status}): {message}")]
    Server { status: StatusCode, message: String },

    /// The exam or attempt does not exist or is inactive.
    #[error("not found: {0}")]
    NotFound(String),

    /// The response body did not decode into the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Request payload rejected before it was sent.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// The best available human-readable message.
    pub fn message(&self) -> String {
        match self {
            ClientError::Server { message, .. } => message.clone(),
            ClientError::NotFound(message) => message.clone(),
            ClientError::Transition(err) => err.to_string(),
            ClientError::Validation(message) => message.clone(),
            ClientError::Network(_) | ClientError::Decode(_) | ClientError::InvalidUrl(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(err: validator::ValidationErrors) -> Self {
        ClientError::Validation(err.to_string())
    }
}

/// Gateway error.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    // 500 Internal Server Error
    #[error("internal error: {0}")]
    InternalServerError(String),

    // 502 Bad Gateway (backend unreachable or unreadable)
    #[error("bad gateway: {0}")]
    BadGateway(String),

    // 400 Bad Request
    #[error("bad request: {0}")]
    BadRequest(String),

    // 401 Unauthorized
    #[error("unauthorized: {0}")]
    AuthError(String),

    // 403 Forbidden
    #[error("forbidden: {0}")]
    Forbidden(String),

    // 404 Not Found
    #[error("not found: {0}")]
    NotFound(String),

    // 409 Conflict (illegal attempt transition)
    #[error("conflict: {0}")]
    Conflict(String),

    // Backend status passed through with its message
    #[error("upstream {0}: {1}")]
    Upstream(StatusCode, String),
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadGateway(msg) => {
                tracing::error!("Backend failure: {}", msg);
                (StatusCode::BAD_GATEWAY, GENERIC_FAILURE_MESSAGE.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Upstream(status, msg) => (status, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Maps client failures onto gateway responses.
/// Allows using `?` on client calls inside handlers.
impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Server { status, message } => {
                if status.is_server_error() {
                    tracing::error!("Backend returned {}: {}", status, message);
                    AppError::Upstream(StatusCode::BAD_GATEWAY, message)
                } else {
                    AppError::Upstream(status, message)
                }
            }
            ClientError::NotFound(msg) => AppError::NotFound(msg),
            ClientError::Transition(e) => AppError::Conflict(e.to_string()),
            ClientError::Validation(msg) => AppError::BadRequest(msg),
            ClientError::Network(e) => AppError::BadGateway(e.to_string()),
            ClientError::Decode(msg) => AppError::BadGateway(msg),
            ClientError::InvalidUrl(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
