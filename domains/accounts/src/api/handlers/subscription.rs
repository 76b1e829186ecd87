//! Subscription API handlers
//!
//! Implements:
//! - GET/POST /functions/v1/check-subscription - Resolve the caller's subscription
//! - POST /functions/v1/create-checkout - Start a hosted checkout
//! - POST /functions/v1/customer-portal - Open the billing self-service portal
//!
//! The caller is always the token's subject; nothing in the body selects
//! whose subscription is read.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tatame_auth::{AuthContext, AuthUser};
use tatame_billing::{BillingError, CheckoutRequest};
use tatame_common::{Error, Result, ValidatedJson};
use validator::Validate;

use super::billing_error;
use crate::api::middleware::AccountsState;
use crate::domain::entities::{Profile, SubscriptionStatus};

/// Request for starting a checkout
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCheckoutRequest {
    /// Recurring price of the chosen plan
    #[validate(length(min = 1, max = 255))]
    pub price_id: String,
}

/// Redirect target on the payment provider
#[derive(Debug, Serialize)]
pub struct RedirectResponse {
    pub url: String,
}

fn caller_email(ctx: &AuthContext) -> Result<&str> {
    ctx.email()
        .map_err(|_| Error::Authentication("Token has no email claim".to_string()))
}

/// Customer id linked to the profile, adopting one the provider already
/// knows by email. `create` decides whether a new customer may be made.
async fn resolve_customer(
    state: &AccountsState,
    profile: &Profile,
    create: bool,
) -> Result<Option<String>> {
    if let Some(id) = &profile.billing_customer_id {
        return Ok(Some(id.clone()));
    }

    let customer = match state
        .billing
        .find_customer_by_email(&profile.email)
        .await
        .map_err(billing_error)?
    {
        Some(customer) => customer,
        None if create => state
            .billing
            .create_customer(&profile.email)
            .await
            .map_err(billing_error)?,
        None => return Ok(None),
    };

    state
        .repos
        .profiles
        .set_billing_customer_id(profile.id, Some(&customer.id))
        .await?;
    tracing::info!(user_id = %profile.id, customer_id = %customer.id, "Linked billing customer");

    Ok(Some(customer.id))
}

/// GET|POST /functions/v1/check-subscription
pub async fn check_subscription(
    State(state): State<AccountsState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<SubscriptionStatus>> {
    let email = caller_email(&ctx)?;
    let profile = state.repos.profiles.upsert(ctx.user_id(), email).await?;

    let Some(customer_id) = resolve_customer(&state, &profile, false).await? else {
        tracing::debug!(user_id = %ctx.user_id(), "No billing customer, unsubscribed");
        return Ok(Json(SubscriptionStatus::unsubscribed()));
    };

    let subscriptions = match state.billing.list_active_subscriptions(&customer_id).await {
        Ok(subscriptions) => subscriptions,
        Err(BillingError::NotFound(_)) => {
            // Customer deleted on the provider side; drop the stale link
            tracing::warn!(user_id = %ctx.user_id(), customer_id = %customer_id, "Linked billing customer no longer exists");
            state
                .repos
                .profiles
                .set_billing_customer_id(ctx.user_id(), None)
                .await?;
            return Ok(Json(SubscriptionStatus::unsubscribed()));
        }
        Err(e) => return Err(billing_error(e)),
    };

    let status = SubscriptionStatus::from_subscriptions(&subscriptions, Utc::now());
    tracing::info!(
        user_id = %ctx.user_id(),
        subscribed = status.subscribed,
        "Subscription checked"
    );

    Ok(Json(status))
}

/// POST /functions/v1/create-checkout
pub async fn create_checkout(
    State(state): State<AccountsState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(request): ValidatedJson<CreateCheckoutRequest>,
) -> Result<Json<RedirectResponse>> {
    let email = caller_email(&ctx)?;
    let profile = state.repos.profiles.upsert(ctx.user_id(), email).await?;
    let customer_id = resolve_customer(&state, &profile, true).await?;

    let session = state
        .billing
        .create_checkout_session(CheckoutRequest {
            customer_id,
            customer_email: profile.email.clone(),
            price_id: request.price_id,
            success_url: state.checkout.success_url.clone(),
            cancel_url: state.checkout.cancel_url.clone(),
            client_reference_id: Some(ctx.user_id().to_string()),
        })
        .await
        .map_err(billing_error)?;

    tracing::info!(user_id = %ctx.user_id(), session_id = %session.id, "Checkout session created");

    Ok(Json(RedirectResponse { url: session.url }))
}

/// POST /functions/v1/customer-portal
pub async fn customer_portal(
    State(state): State<AccountsState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<RedirectResponse>> {
    let email = caller_email(&ctx)?;
    let profile = state.repos.profiles.upsert(ctx.user_id(), email).await?;

    let customer_id = resolve_customer(&state, &profile, false)
        .await?
        .ok_or_else(|| Error::NotFound("No billing account for this user".to_string()))?;

    let portal = state
        .billing
        .create_portal_session(&customer_id, &state.checkout.portal_return_url)
        .await
        .map_err(billing_error)?;

    Ok(Json(RedirectResponse { url: portal.url }))
}
