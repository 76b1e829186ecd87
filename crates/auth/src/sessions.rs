//! Provider-side session verification
//!
//! A session token stays cryptographically valid until `exp`, but the
//! identity provider can revoke it earlier (sign-out, user deletion).
//! Privileged requests ask the provider whether it still honours the token.

use uuid::Uuid;

/// Failure while asking the provider about a session
#[derive(Debug, Clone, thiserror::Error)]
#[error("session check failed: {0}")]
pub struct SessionCheckError(pub String);

#[async_trait::async_trait]
pub trait SessionVerifier: Send + Sync {
    /// `Ok(false)` when the provider no longer honours `access_token` for
    /// `user_id`
    async fn is_active(&self, access_token: &str, user_id: Uuid)
        -> Result<bool, SessionCheckError>;
}
