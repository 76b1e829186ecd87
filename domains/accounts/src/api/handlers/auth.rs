//! Auth introspection API handler
//!
//! Implements:
//! - GET /v1/auth/whoami - Identity and admin flag for the current caller

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tatame_auth::{AuthError, AuthUser};
use uuid::Uuid;

use crate::api::middleware::AccountsState;

/// Response shape for `GET /v1/auth/whoami`
#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub id: Uuid,
    pub email: Option<String>,
    pub is_admin: bool,
    pub expires_at: DateTime<Utc>,
}

/// GET /v1/auth/whoami - Role is read from `user_roles` on every call
pub async fn whoami(
    State(state): State<AccountsState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<WhoamiResponse>, AuthError> {
    let is_admin = state.auth.is_admin(ctx.user_id()).await?;

    // First authenticated call creates the profile row
    if let Some(email) = ctx.user.email.as_deref() {
        if let Err(e) = state.repos.profiles.upsert(ctx.user_id(), email).await {
            tracing::warn!(user_id = %ctx.user_id(), error = %e, "Failed to sync profile");
        }
    }

    Ok(Json(WhoamiResponse {
        id: ctx.user_id(),
        email: ctx.user.email,
        is_admin,
        expires_at: ctx.session_expires_at,
    }))
}
