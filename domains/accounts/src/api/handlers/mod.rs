//! HTTP handlers for the Accounts domain

pub mod auth;
pub mod plans;
pub mod roles;
pub mod setup;
pub mod subscription;
pub mod users;
pub mod webhook;

use tatame_billing::BillingError;
use tatame_common::Error;
use tatame_identity::IdentityError;
use uuid::Uuid;

use crate::api::middleware::AccountsState;

/// Map a payment provider failure onto the API taxonomy
pub(crate) fn billing_error(err: BillingError) -> Error {
    match err {
        BillingError::NotFound(msg) => Error::NotFound(msg),
        other => {
            tracing::error!(error = %other, "Payment provider call failed");
            Error::Upstream(other.to_string())
        }
    }
}

/// Map an identity provider failure onto the API taxonomy
pub(crate) fn identity_error(err: IdentityError) -> Error {
    match err {
        IdentityError::AlreadyExists(msg) => Error::Conflict(msg),
        IdentityError::NotFound(msg) => Error::NotFound(msg),
        IdentityError::Rejected(msg) => Error::Validation(msg),
        other => {
            tracing::error!(error = %other, "Identity provider call failed");
            Error::Upstream(other.to_string())
        }
    }
}

/// Best-effort removal of an account whose creation did not complete.
///
/// Runs every step even when an earlier one fails so a later retry with
/// the same email is not blocked by a leftover identity user.
pub(crate) async fn discard_user(state: &AccountsState, user_id: Uuid) {
    if let Err(e) = state.identity.delete_user(user_id).await {
        tracing::error!(user_id = %user_id, error = %e, "Failed to delete identity user");
    }
    if let Err(e) = state.repos.roles.revoke_all(user_id).await {
        tracing::error!(user_id = %user_id, error = %e, "Failed to revoke roles");
    }
    if let Err(e) = state.repos.profiles.delete(user_id).await {
        tracing::error!(user_id = %user_id, error = %e, "Failed to delete profile");
    }
}
