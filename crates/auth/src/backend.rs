//! Concrete authentication backend
//!
//! Wraps the token verification settings, a `RoleDirectory` and,
//! optionally, a `SessionVerifier`. Identity always comes from the verified
//! token and role membership always comes from the directory; nothing the
//! client sends in a body is consulted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::context::AuthContext;
use crate::error::AuthError;
use crate::roles::{PgRoleDirectory, RoleDirectory};
use crate::sessions::SessionVerifier;
use crate::types::{AppRole, AuthIdentity};

/// Concrete authentication backend.
///
/// Domain states expose this via `FromRef`:
/// ```ignore
/// impl FromRef<MyDomainState> for AuthBackend {
///     fn from_ref(state: &MyDomainState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct AuthBackend {
    config: AuthConfig,
    roles: Arc<dyn RoleDirectory>,
    sessions: Option<Arc<dyn SessionVerifier>>,
}

impl AuthBackend {
    pub fn new(config: AuthConfig, roles: Arc<dyn RoleDirectory>) -> Self {
        Self {
            config,
            roles,
            sessions: None,
        }
    }

    /// Confirm admin sessions with the identity provider before the role check
    pub fn with_session_verifier(mut self, sessions: Arc<dyn SessionVerifier>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Backend reading roles from Postgres
    pub fn postgres(pool: PgPool, config: AuthConfig) -> Self {
        Self::new(config, Arc::new(PgRoleDirectory::new(pool)))
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Verify a session token and resolve the caller's identity
    pub async fn authenticate_jwt(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = crate::jwt::validate_jwt_token(token, &self.config)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidUserId)?;

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp as i64, 0)
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthContext::new(
            AuthIdentity {
                id: user_id,
                email: claims.email,
            },
            expires_at,
        ))
    }

    /// Whether the user currently holds the admin role.
    ///
    /// Lookup failures surface as `RoleLookupFailed`; callers must treat
    /// that as a denial.
    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool, AuthError> {
        self.roles
            .has_role(user_id, AppRole::Admin)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, user_id = %user_id, "Failed to load role assignments");
                AuthError::RoleLookupFailed
            })
    }

    /// Ask the identity provider whether the session is still live.
    ///
    /// Without a configured verifier only the local token checks apply.
    pub async fn confirm_session(&self, token: &str, user_id: Uuid) -> Result<(), AuthError> {
        let Some(sessions) = &self.sessions else {
            return Ok(());
        };

        match sessions.is_active(token, user_id).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::warn!(user_id = %user_id, "Revoked session rejected");
                Err(AuthError::SessionRevoked)
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = %user_id, "Failed to verify session");
                Err(AuthError::SessionCheckFailed)
            }
        }
    }

    /// Verify the token, confirm the session with the provider, then
    /// require an admin row for the resolved user
    pub async fn authorize_admin(&self, token: &str) -> Result<AuthContext, AuthError> {
        let context = self.authenticate_jwt(token).await?;
        self.confirm_session(token, context.user_id()).await?;

        if !self.is_admin(context.user_id()).await? {
            tracing::warn!(user_id = %context.user_id(), "Non-admin caller rejected");
            return Err(AuthError::Forbidden);
        }

        Ok(context)
    }
}
