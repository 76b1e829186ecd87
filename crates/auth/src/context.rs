//! Authenticated caller context

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AuthError;
use crate::types::AuthIdentity;

/// Represents a caller whose session token has been verified
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: AuthIdentity,
    pub session_expires_at: DateTime<Utc>,
}

impl AuthContext {
    pub fn new(user: AuthIdentity, session_expires_at: DateTime<Utc>) -> Self {
        Self {
            user,
            session_expires_at,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    /// Email from the verified token; required for billing lookups
    pub fn email(&self) -> Result<&str, AuthError> {
        self.user.email.as_deref().ok_or(AuthError::MissingEmail)
    }

    /// Whether `user_id` refers to the caller
    pub fn is_self(&self, user_id: Uuid) -> bool {
        self.user.id == user_id
    }
}
