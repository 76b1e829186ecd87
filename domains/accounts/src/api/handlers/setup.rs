//! First-admin bootstrap
//!
//! Implements:
//! - GET /functions/v1/setup-admin - Whether an admin already exists
//! - POST /functions/v1/setup-admin - Create the first admin
//!
//! The only path that grants admin without an admin caller. It is open
//! exactly while `user_roles` holds no admin row; the grant itself is an
//! atomic check-and-insert, so concurrent attempts produce one admin.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tatame_common::{Error, RepositoryError, Result, ValidatedJson};
use uuid::Uuid;
use validator::Validate;

use super::{discard_user, identity_error};
use crate::api::middleware::AccountsState;
use crate::domain::validation::validate_password;

#[derive(Debug, Deserialize, Validate)]
pub struct SetupAdminRequest {
    #[validate(email)]
    pub email: String,

    #[validate(custom(function = "validate_password", message = "Password must be 6 to 72 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SetupStatusResponse {
    pub admin_exists: bool,
}

#[derive(Debug, Serialize)]
pub struct SetupAdminResponse {
    pub success: bool,
    pub user_id: Uuid,
}

fn already_configured() -> Error {
    Error::Conflict("An admin already exists".to_string())
}

/// GET /functions/v1/setup-admin
pub async fn setup_status(State(state): State<AccountsState>) -> Result<Json<SetupStatusResponse>> {
    let admin_exists = state.repos.roles.admin_exists().await?;
    Ok(Json(SetupStatusResponse { admin_exists }))
}

/// POST /functions/v1/setup-admin
pub async fn setup_admin(
    State(state): State<AccountsState>,
    ValidatedJson(request): ValidatedJson<SetupAdminRequest>,
) -> Result<(StatusCode, Json<SetupAdminResponse>)> {
    // Cheap early exit; the bootstrap below is what actually decides
    if state.repos.roles.admin_exists().await? {
        return Err(already_configured());
    }

    let user = state
        .identity
        .create_user(&request.email, &request.password)
        .await
        .map_err(identity_error)?;

    match bootstrap(&state, user.id, &request.email).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(user_id = %user.id, "Lost first-admin race, removing created user");
            discard_user(&state, user.id).await;
            return Err(already_configured());
        }
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "First-admin bootstrap failed, removing created user");
            discard_user(&state, user.id).await;
            return Err(e.into());
        }
    }

    tracing::info!(user_id = %user.id, "First admin created");

    Ok((
        StatusCode::CREATED,
        Json(SetupAdminResponse {
            success: true,
            user_id: user.id,
        }),
    ))
}

/// Profile plus the atomic admin insert; `false` when another admin won
async fn bootstrap(
    state: &AccountsState,
    user_id: Uuid,
    email: &str,
) -> std::result::Result<bool, RepositoryError> {
    state.repos.profiles.upsert(user_id, email).await?;
    state.repos.roles.bootstrap_first_admin(user_id).await
}
