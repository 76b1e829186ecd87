//! Payment provider webhook
//!
//! Implements:
//! - POST /functions/v1/billing-webhook - Link the paying customer to its profile
//!
//! Authenticated by the provider's signature over the raw body, not by a
//! session token.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde::Serialize;
use tatame_billing::webhook::{verify_event, CompletedCheckout, DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER};
use tatame_common::{Error, Result};
use uuid::Uuid;

use crate::api::middleware::AccountsState;
use crate::domain::entities::Profile;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// POST /functions/v1/billing-webhook
pub async fn billing_webhook(
    State(state): State<AccountsState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let secret = state
        .webhook_secret
        .as_deref()
        .ok_or_else(|| Error::NotFound("Billing webhook is not configured".to_string()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Validation("Missing webhook signature".to_string()))?;

    let event = verify_event(
        &body,
        signature,
        secret,
        Utc::now().timestamp(),
        DEFAULT_TOLERANCE_SECS,
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Rejected billing webhook");
        Error::Validation("Invalid webhook signature".to_string())
    })?;

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Billing webhook received");

    if let Some(checkout) = event.completed_checkout() {
        link_customer(&state, &checkout).await?;
    }

    Ok(Json(WebhookAck { received: true }))
}

async fn find_profile(state: &AccountsState, checkout: &CompletedCheckout) -> Result<Option<Profile>> {
    let by_reference = checkout
        .client_reference_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok());
    if let Some(user_id) = by_reference {
        if let Some(profile) = state.repos.profiles.get(user_id).await? {
            return Ok(Some(profile));
        }
    }

    match checkout.customer_email.as_deref() {
        Some(email) => Ok(state.repos.profiles.find_by_email(email).await?),
        None => Ok(None),
    }
}

async fn link_customer(state: &AccountsState, checkout: &CompletedCheckout) -> Result<()> {
    let Some(profile) = find_profile(state, checkout).await? else {
        // Acknowledge anyway; check-subscription links by email later
        tracing::warn!(customer_id = %checkout.customer_id, "No profile for completed checkout");
        return Ok(());
    };

    if profile.billing_customer_id.as_deref() == Some(checkout.customer_id.as_str()) {
        return Ok(());
    }

    state
        .repos
        .profiles
        .set_billing_customer_id(profile.id, Some(&checkout.customer_id))
        .await?;
    tracing::info!(
        user_id = %profile.id,
        customer_id = %checkout.customer_id,
        "Linked billing customer from checkout"
    );

    Ok(())
}
