//! Tatame Billing Service
//!
//! Wraps the payment provider behind the `BillingService` trait:
//! - Stripe REST integration for production
//! - Programmable mock for tests and local development
//! - Webhook signature verification
//!
//! The provider's secret key only ever lives in backend processes.

pub mod mock;
pub mod stripe;
pub mod webhook;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Billing configuration error: {0}")]
    Configuration(String),

    #[error("Billing request error: {0}")]
    Request(String),

    #[error("Billing response error: {0}")]
    Response(String),

    #[error("Billing provider rate limit exceeded")]
    RateLimit,

    #[error("Billing resource not found: {0}")]
    NotFound(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,
}

/// Billing customer known to the payment provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
}

/// Provider-side subscription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
    #[serde(other)]
    Unknown,
}

/// Subscription as reported by the payment provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer_id: String,
    pub status: SubscriptionState,
    pub product_id: Option<String>,
    pub price_id: Option<String>,
    pub current_period_end: DateTime<Utc>,
}

impl Subscription {
    /// Whether this subscription entitles its customer at `now`.
    ///
    /// Status alone is not enough: a period end in the past means the
    /// provider has not caught up yet and access is denied.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status,
            SubscriptionState::Active | SubscriptionState::Trialing
        ) && self.current_period_end > now
    }
}

/// Billing interval of a recurring plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanInterval {
    Month,
    Year,
}

impl PlanInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanInterval::Month => "month",
            PlanInterval::Year => "year",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "month" => Some(PlanInterval::Month),
            "year" => Some(PlanInterval::Year),
            _ => None,
        }
    }
}

/// Paid plan (provider product plus its default recurring price)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_id: Option<String>,
    /// Price in minor currency units (centavos)
    pub unit_amount: Option<i64>,
    pub currency: Option<String>,
    pub interval: Option<PlanInterval>,
    pub active: bool,
}

/// Input for creating a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlan {
    pub name: String,
    pub description: Option<String>,
    pub unit_amount: i64,
    pub currency: String,
    pub interval: PlanInterval,
}

/// Partial plan update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Input for a hosted subscription checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub customer_id: Option<String>,
    pub customer_email: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Local user id echoed back in the completion webhook
    pub client_reference_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalSession {
    pub url: String,
}

/// Billing service configuration
#[derive(Clone)]
pub struct BillingConfig {
    /// Payment provider (stripe, mock)
    pub provider: String,
    pub secret_key: Option<String>,
    /// Override for the provider API base URL (tests, proxies)
    pub api_base_url: Option<String>,
}

impl std::fmt::Debug for BillingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingConfig")
            .field("provider", &self.provider)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Payment provider operations used by the backend
#[async_trait::async_trait]
pub trait BillingService: Send + Sync {
    /// Find the first customer registered with `email`
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, BillingError>;

    async fn create_customer(&self, email: &str) -> Result<Customer, BillingError>;

    /// Subscriptions the provider reports as active for a customer
    async fn list_active_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Subscription>, BillingError>;

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError>;

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError>;

    /// Active plans, sorted by price
    async fn list_plans(&self) -> Result<Vec<Plan>, BillingError>;

    async fn create_plan(&self, plan: NewPlan) -> Result<Plan, BillingError>;

    async fn update_plan(&self, plan_id: &str, update: PlanUpdate) -> Result<Plan, BillingError>;

    /// Deactivate a plan; existing subscribers keep their subscription
    async fn archive_plan(&self, plan_id: &str) -> Result<Plan, BillingError>;
}

/// Factory for creating BillingService implementations
pub struct BillingServiceFactory;

impl BillingServiceFactory {
    pub fn create(config: BillingConfig) -> Result<Box<dyn BillingService>, BillingError> {
        match config.provider.as_str() {
            "stripe" => {
                tracing::info!("Creating Stripe billing service");
                let secret_key = config.secret_key.ok_or_else(|| {
                    BillingError::Configuration("Stripe secret key is required".to_string())
                })?;
                Ok(Box::new(stripe::StripeBillingService::new(
                    secret_key,
                    config.api_base_url,
                )))
            }
            "mock" => {
                tracing::info!("Creating mock billing service");
                Ok(Box::new(mock::MockBillingService::new()))
            }
            provider => Err(BillingError::Configuration(format!(
                "Unknown billing provider: {}. Supported providers: stripe, mock",
                provider
            ))),
        }
    }
}

/// Sort plans the way the pricing page shows them: cheapest first
pub(crate) fn sort_plans(plans: &mut [Plan]) {
    plans.sort_by(|a, b| {
        a.unit_amount
            .unwrap_or(i64::MAX)
            .cmp(&b.unit_amount.unwrap_or(i64::MAX))
            .then_with(|| a.name.cmp(&b.name))
    });
}
