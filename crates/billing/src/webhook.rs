//! Payment provider webhook verification
//!
//! Stripe signs each delivery with a `Stripe-Signature` header of the form
//! `t=<unix seconds>,v1=<hex hmac>[,v1=...]`. The HMAC covers
//! `"{t}.{raw body}"` keyed with the endpoint secret.

use serde::Deserialize;
use tatame_common::{compute_hmac_sha256, verify_hmac_sha256};

use crate::BillingError;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum accepted age of a signed delivery, in seconds
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Verified webhook event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Fields of a completed checkout the backend acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub customer_id: String,
    pub customer_email: Option<String>,
    pub client_reference_id: Option<String>,
}

impl WebhookEvent {
    /// Extract the completed checkout, if this is a `checkout.session.completed` event
    pub fn completed_checkout(&self) -> Option<CompletedCheckout> {
        if self.event_type != "checkout.session.completed" {
            return None;
        }
        let object = &self.data.object;
        let customer_id = object.get("customer")?.as_str()?.to_string();
        let customer_email = object
            .get("customer_details")
            .and_then(|d| d.get("email"))
            .or_else(|| object.get("customer_email"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let client_reference_id = object
            .get("client_reference_id")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Some(CompletedCheckout {
            customer_id,
            customer_email,
            client_reference_id,
        })
    }
}

/// Verify the signature header against the raw body and parse the event.
///
/// `now` is unix seconds; deliveries older than `tolerance_secs` are rejected
/// to stop replays.
pub fn verify_event(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<WebhookEvent, BillingError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(BillingError::InvalidSignature)?;
    if signatures.is_empty() {
        return Err(BillingError::InvalidSignature);
    }
    if now.abs_diff(timestamp) > tolerance_secs.unsigned_abs() {
        tracing::warn!(timestamp, now, "Webhook timestamp outside tolerance");
        return Err(BillingError::InvalidSignature);
    }

    let mut signed = format!("{}.", timestamp).into_bytes();
    signed.extend_from_slice(payload);

    if !signatures
        .iter()
        .any(|sig| verify_hmac_sha256(secret.as_bytes(), &signed, sig))
    {
        return Err(BillingError::InvalidSignature);
    }

    serde_json::from_slice(payload)
        .map_err(|e| BillingError::Response(format!("Invalid webhook payload: {}", e)))
}

/// Build a signature header for `payload`, as the provider would
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut signed = format!("{}.", timestamp).into_bytes();
    signed.extend_from_slice(payload);
    format!(
        "t={},v1={}",
        timestamp,
        compute_hmac_sha256(secret.as_bytes(), &signed)
    )
}
