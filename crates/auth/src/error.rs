//! Authentication and authorization errors
//!
//! 401 means "log in", 403 means "access denied"; clients rely on the
//! distinction.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Authentication error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    MissingAuthorization,
    InvalidAuthorizationFormat,
    InvalidToken,
    InvalidUserId,
    /// Token carries no email, which billing lookups need
    MissingEmail,
    /// Identity provider no longer honours the token
    SessionRevoked,
    /// Authenticated, but the role table has no admin row for the caller
    Forbidden,
    RoleLookupFailed,
    /// Identity provider could not confirm the session
    SessionCheckFailed,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthorization
            | AuthError::InvalidAuthorizationFormat
            | AuthError::InvalidToken
            | AuthError::InvalidUserId
            | AuthError::MissingEmail
            | AuthError::SessionRevoked => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::RoleLookupFailed => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::SessionCheckFailed => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match self {
            AuthError::MissingAuthorization => {
                ("MISSING_AUTHORIZATION", "Authorization header required")
            }
            AuthError::InvalidAuthorizationFormat => (
                "INVALID_AUTHORIZATION",
                "Invalid authorization header format",
            ),
            AuthError::InvalidToken => ("INVALID_TOKEN", "Invalid or expired token"),
            AuthError::InvalidUserId => ("INVALID_TOKEN", "Invalid user ID in token"),
            AuthError::MissingEmail => ("INVALID_TOKEN", "Token has no email claim"),
            AuthError::SessionRevoked => ("SESSION_REVOKED", "Session is no longer valid"),
            AuthError::Forbidden => ("FORBIDDEN", "Admin role required"),
            AuthError::RoleLookupFailed => ("AUTH_ERROR", "Failed to verify role"),
            AuthError::SessionCheckFailed => (
                "UPSTREAM_UNAVAILABLE",
                "Identity provider could not verify the session",
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
