//! Stripe API Implementation
//!
//! Calls the Stripe REST API (https://api.stripe.com/v1) using the reqwest
//! HTTP client. Stripe takes form-encoded request bodies and returns JSON.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{
    sort_plans, BillingError, BillingService, CheckoutRequest, CheckoutSession, Customer,
    NewPlan, Plan, PlanInterval, PlanUpdate, PortalSession, Subscription, SubscriptionState,
};

const DEFAULT_BASE_URL: &str = "https://api.stripe.com";

/// Stripe list envelope
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CustomerObject {
    id: String,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    customer: String,
    status: SubscriptionState,
    /// Older API versions report the period on the subscription itself
    current_period_end: Option<i64>,
    items: SubscriptionItems,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItems {
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    price: PriceRef,
    /// Newer API versions moved the period onto each item
    current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PriceRef {
    id: String,
    product: String,
}

#[derive(Debug, Deserialize)]
struct ProductObject {
    id: String,
    name: String,
    description: Option<String>,
    active: bool,
    default_price: Option<Expandable<PriceObject>>,
}

/// A field that is an id unless `expand[]` asked for the object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Expandable<T> {
    Object(T),
    Id(String),
}

#[derive(Debug, Deserialize)]
struct PriceObject {
    id: String,
    unit_amount: Option<i64>,
    currency: String,
    recurring: Option<Recurring>,
}

#[derive(Debug, Deserialize)]
struct Recurring {
    interval: String,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PortalObject {
    url: String,
}

/// Stripe API error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: Option<String>,
}

impl SubscriptionObject {
    fn into_subscription(self) -> Result<Subscription, BillingError> {
        let first_item = self.items.data.first();
        let period_end = self
            .current_period_end
            .or_else(|| first_item.and_then(|item| item.current_period_end))
            .ok_or_else(|| {
                BillingError::Response(format!(
                    "Subscription {} has no current period end",
                    self.id
                ))
            })?;

        Ok(Subscription {
            customer_id: self.customer,
            status: self.status,
            product_id: first_item.map(|item| item.price.product.clone()),
            price_id: first_item.map(|item| item.price.id.clone()),
            current_period_end: timestamp(period_end)?,
            id: self.id,
        })
    }
}

impl ProductObject {
    fn into_plan(self) -> Plan {
        let price = match self.default_price {
            Some(Expandable::Object(price)) => Some(price),
            _ => None,
        };

        Plan {
            id: self.id,
            name: self.name,
            description: self.description,
            price_id: price.as_ref().map(|p| p.id.clone()),
            unit_amount: price.as_ref().and_then(|p| p.unit_amount),
            currency: price.as_ref().map(|p| p.currency.clone()),
            interval: price
                .as_ref()
                .and_then(|p| p.recurring.as_ref())
                .and_then(|r| PlanInterval::parse(&r.interval)),
            active: self.active,
        }
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, BillingError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| BillingError::Response(format!("Invalid timestamp: {}", secs)))
}

/// Stripe billing service implementation
pub struct StripeBillingService {
    client: Client,
    secret_key: String,
    base_url: String,
}

impl StripeBillingService {
    /// Create a new Stripe service
    pub fn new(secret_key: String, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/v1/{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}/v1/{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BillingError> {
        let response = request
            .send()
            .await
            .map_err(|e| BillingError::Request(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(BillingError::RateLimit);
        }

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());

            let detail = match serde_json::from_str::<ErrorResponse>(&error_body) {
                Ok(error_response) => format!(
                    "Stripe API error ({}): {}",
                    error_response.error.error_type,
                    error_response.error.message.unwrap_or_default()
                ),
                Err(_) => format!("Stripe API returned {}: {}", status, error_body),
            };

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(BillingError::NotFound(detail));
            }
            return Err(BillingError::Response(detail));
        }

        response
            .json()
            .await
            .map_err(|e| BillingError::Response(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait::async_trait]
impl BillingService for StripeBillingService {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, BillingError> {
        let list: ListResponse<CustomerObject> = self
            .send(self.get("customers").query(&[("email", email), ("limit", "1")]))
            .await?;

        Ok(list.data.into_iter().next().map(|c| Customer {
            id: c.id,
            email: c.email,
        }))
    }

    async fn create_customer(&self, email: &str) -> Result<Customer, BillingError> {
        let customer: CustomerObject = self
            .send(self.post("customers").form(&[("email", email)]))
            .await?;

        tracing::info!(customer_id = %customer.id, "Created Stripe customer");

        Ok(Customer {
            id: customer.id,
            email: customer.email,
        })
    }

    async fn list_active_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Subscription>, BillingError> {
        let list: ListResponse<SubscriptionObject> = self
            .send(self.get("subscriptions").query(&[
                ("customer", customer_id),
                ("status", "active"),
                ("limit", "10"),
            ]))
            .await?;

        list.data
            .into_iter()
            .map(SubscriptionObject::into_subscription)
            .collect()
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        let mut form: Vec<(&str, String)> = vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", request.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", request.success_url),
            ("cancel_url", request.cancel_url),
        ];

        // Stripe rejects customer and customer_email together
        match request.customer_id {
            Some(customer_id) => form.push(("customer", customer_id)),
            None => form.push(("customer_email", request.customer_email)),
        }

        if let Some(reference) = request.client_reference_id {
            form.push(("client_reference_id", reference));
        }

        tracing::debug!(price_id = %request.price_id, "Creating Stripe checkout session");

        let session: SessionObject = self.send(self.post("checkout/sessions").form(&form)).await?;

        let url = session.url.ok_or_else(|| {
            BillingError::Response(format!("Checkout session {} has no URL", session.id))
        })?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError> {
        let portal: PortalObject = self
            .send(
                self.post("billing_portal/sessions")
                    .form(&[("customer", customer_id), ("return_url", return_url)]),
            )
            .await?;

        Ok(PortalSession { url: portal.url })
    }

    async fn list_plans(&self) -> Result<Vec<Plan>, BillingError> {
        let list: ListResponse<ProductObject> = self
            .send(self.get("products").query(&[
                ("active", "true"),
                ("limit", "100"),
                ("expand[]", "data.default_price"),
            ]))
            .await?;

        let mut plans: Vec<Plan> = list.data.into_iter().map(ProductObject::into_plan).collect();
        sort_plans(&mut plans);
        Ok(plans)
    }

    async fn create_plan(&self, plan: NewPlan) -> Result<Plan, BillingError> {
        let mut form: Vec<(&str, String)> = vec![
            ("name", plan.name),
            ("default_price_data[unit_amount]", plan.unit_amount.to_string()),
            ("default_price_data[currency]", plan.currency.to_lowercase()),
            (
                "default_price_data[recurring][interval]",
                plan.interval.as_str().to_string(),
            ),
            ("expand[]", "default_price".to_string()),
        ];
        if let Some(description) = plan.description {
            form.push(("description", description));
        }

        let product: ProductObject = self.send(self.post("products").form(&form)).await?;

        tracing::info!(plan_id = %product.id, "Created Stripe product");

        Ok(product.into_plan())
    }

    async fn update_plan(&self, plan_id: &str, update: PlanUpdate) -> Result<Plan, BillingError> {
        let mut form: Vec<(&str, String)> = vec![("expand[]", "default_price".to_string())];
        if let Some(name) = update.name {
            form.push(("name", name));
        }
        if let Some(description) = update.description {
            form.push(("description", description));
        }

        let product: ProductObject = self
            .send(self.post(&format!("products/{}", plan_id)).form(&form))
            .await?;

        Ok(product.into_plan())
    }

    async fn archive_plan(&self, plan_id: &str) -> Result<Plan, BillingError> {
        let product: ProductObject = self
            .send(self.post(&format!("products/{}", plan_id)).form(&[
                ("active", "false"),
                ("expand[]", "default_price"),
            ]))
            .await?;

        tracing::info!(plan_id = %plan_id, "Archived Stripe product");

        Ok(product.into_plan())
    }
}
