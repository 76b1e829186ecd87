//! Client-side error taxonomy
//!
//! Backend failures arrive as a non-2xx status with
//! `{"error": {"code", "message"}}`; they are parsed once here so callers
//! match on a variant instead of probing response fields.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Missing, invalid or expired session
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Valid session, insufficient role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend or provider answered with a server error
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl ClientError {
    /// Map a backend error response to a variant
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|e| format!("{} ({})", e.error.message, e.error.code))
            .unwrap_or_else(|_| format!("HTTP {}", status));

        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthenticated(message),
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT => ClientError::Conflict(message),
            s if s.is_client_error() => ClientError::Validation(message),
            _ => ClientError::Upstream(message),
        }
    }

    /// Whether the identity provider or backend could not be reached or failed
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Upstream(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}
