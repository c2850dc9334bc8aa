// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 402 Payment Required (insufficient balance, ledger refusal)
    PaymentRequired(String),

    // 403 Forbidden (e.g., strict fullscreen policy)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (illegal transition, duplicate submission)
    Conflict(String),

    // 502 Bad Gateway (a collaborator misbehaved)
    Upstream(String),

    // 503 Service Unavailable (retryable submission failure)
    ServiceUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

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
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PaymentRequired(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Failures reported by (or while talking to) an external collaborator:
/// the content repository, the ledger or the result store.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The collaborator understood the request and refused it.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The result store already holds a submission for this pair.
    #[error("duplicate submission for student {student_id} on test {test_id}")]
    Duplicate { student_id: String, test_id: String },

    /// Network failure or unexpected status.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The collaborator answered with a body we could not decode.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors raised by the session engine.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while session is {phase}")]
    InvalidTransition { action: &'static str, phase: String },

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("question index {index} is out of range (0..{len})")]
    QuestionOutOfRange { index: usize, len: usize },

    #[error("answer does not fit question {index}")]
    AnswerMismatch { index: usize },

    #[error("insufficient balance: test costs {cost}, balance is {balance}")]
    InsufficientBalance { cost: i64, balance: i64 },

    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    #[error("fullscreen is required to continue this test")]
    FullscreenRequired,

    /// Answers are locked once a submission payload has been assembled.
    #[error("answers are frozen while a submission is pending")]
    SubmissionFrozen,

    #[error("a result for this test has already been recorded")]
    AlreadySubmitted,

    #[error("submission failed, please retry: {0}")]
    SubmissionFailed(String),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl SessionError {
    /// Whether the caller may repeat the same intent later and expect a different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::InsufficientBalance { .. }
                | SessionError::PaymentDeclined(_)
                | SessionError::FullscreenRequired
                | SessionError::SubmissionFailed(_)
                | SessionError::Collaborator(CollaboratorError::Unavailable(_))
        )
    }
}

/// Converts engine errors into HTTP-facing errors.
/// Allows handlers to use `?` on controller calls.
impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        let msg = err.to_string();
        match err {
            SessionError::InvalidTransition { .. }
            | SessionError::SubmissionFrozen
            | SessionError::AlreadySubmitted => AppError::Conflict(msg),
            SessionError::QuestionOutOfRange { .. } | SessionError::AnswerMismatch { .. } => {
                AppError::BadRequest(msg)
            }
            SessionError::InsufficientBalance { .. } | SessionError::PaymentDeclined(_) => {
                AppError::PaymentRequired(msg)
            }
            SessionError::FullscreenRequired => AppError::Forbidden(msg),
            SessionError::SubmissionFailed(_) => AppError::ServiceUnavailable(msg),
            SessionError::InvalidContent(_) | SessionError::Collaborator(_) => {
                AppError::Upstream(msg)
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}
