//! Role management API handler
//!
//! Implements:
//! - POST /functions/v1/manage-roles - Grant or revoke the admin role (admin)

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tatame_auth::{AdminUser, AppRole};
use tatame_common::{Error, Result, ValidatedJson};
use uuid::Uuid;
use validator::Validate;

use crate::api::middleware::AccountsState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManageRolesRequest {
    pub target_user_id: Uuid,
    pub make_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// POST /functions/v1/manage-roles
///
/// Idempotent: granting an existing role or revoking a missing one
/// succeeds without touching the table.
pub async fn manage_roles(
    State(state): State<AccountsState>,
    AdminUser(ctx): AdminUser,
    ValidatedJson(request): ValidatedJson<ManageRolesRequest>,
) -> Result<Json<SuccessResponse>> {
    let target = request.target_user_id;

    // Keeps the console from locking out the admin who is using it
    if ctx.is_self(target) && !request.make_admin {
        return Err(Error::Validation(
            "Admins cannot revoke their own admin role".to_string(),
        ));
    }

    if state.repos.profiles.get(target).await?.is_none() {
        return Err(Error::NotFound(format!("User {} not found", target)));
    }

    let changed = if request.make_admin {
        state.repos.roles.grant(target, AppRole::Admin).await?
    } else {
        state.repos.roles.revoke(target, AppRole::Admin).await?
    };

    tracing::info!(
        admin_id = %ctx.user_id(),
        target_user_id = %target,
        make_admin = request.make_admin,
        changed,
        "Admin role updated"
    );

    Ok(Json(SuccessResponse { success: true }))
}
