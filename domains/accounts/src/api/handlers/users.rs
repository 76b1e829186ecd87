//! Admin user management API handlers
//!
//! Implements:
//! - GET /functions/v1/admin-users - Paginated profiles with admin flag (admin)
//! - DELETE /functions/v1/admin-users/{user_id} - Delete a user (admin)
//! - PATCH /functions/v1/admin-users/{user_id}/billing - Set billing customer id (admin)
//! - POST /functions/v1/create-user - Create a user, optionally admin (admin)
//! - POST /functions/v1/update-user-password - Set a user's password (admin)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tatame_auth::{AdminUser, AppRole};
use tatame_common::{Error, Page, Pagination, RepositoryError, Result, ValidatedJson};
use tatame_identity::IdentityError;
use uuid::Uuid;
use validator::Validate;

use super::{discard_user, identity_error};
use super::roles::SuccessResponse;
use crate::api::middleware::AccountsState;
use crate::domain::entities::{AdminUserView, Profile};
use crate::domain::validation::{validate_billing_customer_id, validate_password};

/// Query parameters for listing users
#[derive(Debug, Deserialize, Default)]
pub struct AdminUsersQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    /// Substring of the email
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,

    #[validate(custom(function = "validate_password", message = "Password must be 6 to 72 characters"))]
    pub password: String,

    #[serde(default)]
    pub make_admin: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub user_id: Uuid,

    #[validate(custom(function = "validate_password", message = "Password must be 6 to 72 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBillingRequest {
    /// `null` unlinks the customer
    #[validate(custom(function = "validate_billing_customer_id", message = "Invalid customer id"))]
    pub billing_customer_id: Option<String>,
}

/// GET /functions/v1/admin-users
pub async fn list_users(
    State(state): State<AccountsState>,
    AdminUser(_ctx): AdminUser,
    Query(query): Query<AdminUsersQuery>,
) -> Result<Json<Page<AdminUserView>>> {
    let pagination = Pagination {
        offset: query.offset,
        limit: query.limit,
    };
    let search = query.search.as_deref().filter(|s| !s.trim().is_empty());

    let (profiles, total) = state
        .repos
        .profiles
        .list(search, pagination.offset(), pagination.limit())
        .await?;

    let ids: Vec<Uuid> = profiles.iter().map(|p| p.id).collect();
    let admins = state.repos.roles.admins_among(&ids).await?;

    let page = Page::new(profiles, total, pagination).map(|profile| {
        let is_admin = admins.contains(&profile.id);
        AdminUserView::new(profile, is_admin)
    });

    Ok(Json(page))
}

/// POST /functions/v1/create-user
pub async fn create_user(
    State(state): State<AccountsState>,
    AdminUser(ctx): AdminUser,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<AdminUserView>)> {
    let user = state
        .identity
        .create_user(&request.email, &request.password)
        .await
        .map_err(identity_error)?;

    let profile = match provision(&state, user.id, &request.email, request.make_admin).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "User provisioning failed, removing created user");
            discard_user(&state, user.id).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        admin_id = %ctx.user_id(),
        user_id = %user.id,
        make_admin = request.make_admin,
        "User created"
    );

    Ok((
        StatusCode::CREATED,
        Json(AdminUserView::new(profile, request.make_admin)),
    ))
}

/// Profile row and optional admin grant for a freshly created identity user
async fn provision(
    state: &AccountsState,
    user_id: Uuid,
    email: &str,
    make_admin: bool,
) -> std::result::Result<Profile, RepositoryError> {
    let profile = state.repos.profiles.upsert(user_id, email).await?;
    if make_admin {
        state.repos.roles.grant(user_id, AppRole::Admin).await?;
    }
    Ok(profile)
}

/// POST /functions/v1/update-user-password
pub async fn update_user_password(
    State(state): State<AccountsState>,
    AdminUser(ctx): AdminUser,
    ValidatedJson(request): ValidatedJson<UpdatePasswordRequest>,
) -> Result<Json<SuccessResponse>> {
    state
        .identity
        .update_password(request.user_id, &request.password)
        .await
        .map_err(identity_error)?;

    tracing::info!(admin_id = %ctx.user_id(), user_id = %request.user_id, "Password updated");

    Ok(Json(SuccessResponse { success: true }))
}

/// PATCH /functions/v1/admin-users/{user_id}/billing
pub async fn update_billing_id(
    State(state): State<AccountsState>,
    AdminUser(ctx): AdminUser,
    Path(user_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateBillingRequest>,
) -> Result<Json<AdminUserView>> {
    let profile = state
        .repos
        .profiles
        .set_billing_customer_id(user_id, request.billing_customer_id.as_deref())
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))?;

    let is_admin = state.repos.roles.has_role(user_id, AppRole::Admin).await?;

    tracing::info!(admin_id = %ctx.user_id(), user_id = %user_id, "Billing customer id updated");

    Ok(Json(AdminUserView::new(profile, is_admin)))
}

/// DELETE /functions/v1/admin-users/{user_id}
pub async fn delete_user(
    State(state): State<AccountsState>,
    AdminUser(ctx): AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode> {
    if ctx.is_self(user_id) {
        return Err(Error::Validation("Admins cannot delete themselves".to_string()));
    }

    let identity_deleted = match state.identity.delete_user(user_id).await {
        Ok(()) => true,
        Err(IdentityError::NotFound(_)) => false,
        Err(e) => return Err(identity_error(e)),
    };

    state.repos.roles.revoke_all(user_id).await?;
    let profile_deleted = state.repos.profiles.delete(user_id).await?;

    if !identity_deleted && !profile_deleted {
        return Err(Error::NotFound(format!("User {} not found", user_id)));
    }

    tracing::info!(admin_id = %ctx.user_id(), user_id = %user_id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}
