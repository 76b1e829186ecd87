//! Route definitions for Accounts domain API

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use super::handlers::{auth, plans, roles, setup, subscription, users, webhook};
use super::middleware::AccountsState;

/// Create auth introspection routes
fn auth_routes() -> Router<AccountsState> {
    Router::new().route("/v1/auth/whoami", get(auth::whoami))
}

/// Create subscription and payment routes
fn subscription_routes() -> Router<AccountsState> {
    Router::new()
        .route(
            "/functions/v1/check-subscription",
            get(subscription::check_subscription).post(subscription::check_subscription),
        )
        .route(
            "/functions/v1/create-checkout",
            post(subscription::create_checkout),
        )
        .route(
            "/functions/v1/customer-portal",
            post(subscription::customer_portal),
        )
        .route(
            "/functions/v1/billing-webhook",
            post(webhook::billing_webhook),
        )
}

/// Create plan routes
fn plan_routes() -> Router<AccountsState> {
    Router::new()
        .route("/functions/v1/plans", get(plans::list_plans))
        .route("/functions/v1/manage-plans", post(plans::manage_plans))
}

/// Create admin routes: roles, bootstrap and user management
fn admin_routes() -> Router<AccountsState> {
    Router::new()
        .route("/functions/v1/manage-roles", post(roles::manage_roles))
        .route(
            "/functions/v1/setup-admin",
            get(setup::setup_status).post(setup::setup_admin),
        )
        .route("/functions/v1/admin-users", get(users::list_users))
        .route(
            "/functions/v1/admin-users/{user_id}",
            delete(users::delete_user),
        )
        .route(
            "/functions/v1/admin-users/{user_id}/billing",
            patch(users::update_billing_id),
        )
        .route("/functions/v1/create-user", post(users::create_user))
        .route(
            "/functions/v1/update-user-password",
            post(users::update_user_password),
        )
}

/// Create all Accounts domain API routes
pub fn routes() -> Router<AccountsState> {
    Router::new()
        .merge(auth_routes())
        .merge(subscription_routes())
        .merge(plan_routes())
        .merge(admin_routes())
}
