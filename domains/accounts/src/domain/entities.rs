//! Domain entities for the Accounts domain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tatame_auth::AppRole;
use tatame_billing::Subscription;

/// Per-user record keyed by the identity provider's user id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    /// Payment provider customer id, once one has been created or linked
    pub billing_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: normalize_email(&email.into()),
            billing_customer_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One `(user_id, role)` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: AppRole,
    pub created_at: DateTime<Utc>,
}

impl RoleAssignment {
    pub fn new(user_id: Uuid, role: AppRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            role,
            created_at: Utc::now(),
        }
    }
}

/// Answer of `check-subscription`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub subscribed: bool,
    pub product_id: Option<String>,
    pub subscription_end: Option<DateTime<Utc>>,
}

impl SubscriptionStatus {
    pub fn unsubscribed() -> Self {
        Self::default()
    }

    /// First subscription that is active and whose period has not ended
    pub fn from_subscriptions(subscriptions: &[Subscription], now: DateTime<Utc>) -> Self {
        subscriptions
            .iter()
            .find(|s| s.is_active_at(now))
            .map(|s| Self {
                subscribed: true,
                product_id: s.product_id.clone(),
                subscription_end: Some(s.current_period_end),
            })
            .unwrap_or_default()
    }
}

/// Profile row as shown in the admin console
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminUserView {
    pub id: Uuid,
    pub email: String,
    pub billing_customer_id: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl AdminUserView {
    pub fn new(profile: Profile, is_admin: bool) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            billing_customer_id: profile.billing_customer_id,
            is_admin,
            created_at: profile.created_at,
        }
    }
}

/// Emails are compared case-insensitively everywhere
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
