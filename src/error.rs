/*
 * Responsibility
 * - ezpass lookup の失敗を表す LookupError / ErrorKind の定義
 * - IntoResponse 実装 (HTTP status / {"meta":{"error":...}} body)
 * - reqwest / serde_json / task の失敗を Unknown に畳み込む
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a failed lookup.
///
/// Callers branch on this instead of matching error values, so the cause
/// carried by `Unknown` never affects equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Why a lookup ended up as `Unknown`.
#[derive(Debug, Error)]
pub enum UnknownCause {
    /// Connection, DNS or body read failure. The request URL is stripped
    /// because it carries the access token.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("invalid pass payload: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("unexpected status: {0}")]
    Status(StatusCode),

    #[error("lookup task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("ezpass: unauthorized")]
    Unauthorized,

    #[error("ezpass: not found (user is not in group)")]
    NotFound,

    #[error("ezpass: timeout")]
    Timeout,

    #[error("ezpass: unknown error")]
    Unknown(#[source] UnknownCause),
}

impl LookupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LookupError::Unauthorized => ErrorKind::Unauthorized,
            LookupError::NotFound => ErrorKind::NotFound,
            LookupError::Timeout => ErrorKind::Timeout,
            LookupError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        LookupError::Unknown(UnknownCause::Transport(e.without_url()))
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(e: serde_json::Error) -> Self {
        LookupError::Unknown(UnknownCause::Decode(e))
    }
}

impl From<tokio::task::JoinError> for LookupError {
    fn from(e: tokio::task::JoinError) -> Self {
        LookupError::Unknown(UnknownCause::Task(e))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub meta: ErrorMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorMeta {
    pub error: String,
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            meta: ErrorMeta {
                error: self.to_string(),
            },
        };

        (self.status(), Json(body)).into_response()
    }
}
