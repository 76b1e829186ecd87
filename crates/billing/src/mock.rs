//! Mock Billing Service Implementation
//!
//! Programmable mock for testing subscription and checkout flows:
//! - seed customers, subscriptions and plans
//! - simulate a provider outage
//! - inspect recorded checkout requests and call counts

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::{
    sort_plans, BillingError, BillingService, CheckoutRequest, CheckoutSession, Customer,
    NewPlan, Plan, PlanUpdate, PortalSession, Subscription, SubscriptionState,
};

#[derive(Debug, Default)]
struct MockState {
    customers: Vec<Customer>,
    subscriptions: Vec<Subscription>,
    plans: HashMap<String, Plan>,
    checkouts: Vec<CheckoutRequest>,
    unavailable: bool,
    next_id: u64,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_mock_{}", prefix, self.next_id)
    }
}

/// Mock billing service for testing
#[derive(Debug, Clone, Default)]
pub struct MockBillingService {
    state: Arc<RwLock<MockState>>,
    calls: Arc<AtomicUsize>,
}

impl MockBillingService {
    /// Create an empty mock billing service
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Count a provider call and fail if an outage is simulated
    fn enter(&self) -> Result<(), BillingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.read().unavailable {
            return Err(BillingError::Request(
                "Mock billing provider unavailable".to_string(),
            ));
        }
        Ok(())
    }

    /// Register a customer and return its id
    pub fn add_customer(&self, email: &str) -> String {
        let mut state = self.write();
        let id = state.next_id("cus");
        state.customers.push(Customer {
            id: id.clone(),
            email: Some(email.to_string()),
        });
        id
    }

    /// Attach a subscription to a customer
    pub fn add_subscription(
        &self,
        customer_id: &str,
        product_id: &str,
        status: SubscriptionState,
        current_period_end: DateTime<Utc>,
    ) -> String {
        let mut state = self.write();
        let id = state.next_id("sub");
        state.subscriptions.push(Subscription {
            id: id.clone(),
            customer_id: customer_id.to_string(),
            status,
            product_id: Some(product_id.to_string()),
            price_id: Some(format!("price_{}", product_id)),
            current_period_end,
        });
        id
    }

    /// Seed a plan as-is
    pub fn add_plan(&self, plan: Plan) {
        self.write().plans.insert(plan.id.clone(), plan);
    }

    /// Simulate the provider being unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.write().unavailable = unavailable;
    }

    /// Number of provider calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Checkout requests received so far
    pub fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.read().checkouts.clone()
    }
}

#[async_trait::async_trait]
impl BillingService for MockBillingService {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, BillingError> {
        self.enter()?;
        Ok(self
            .read()
            .customers
            .iter()
            .find(|c| c.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_customer(&self, email: &str) -> Result<Customer, BillingError> {
        self.enter()?;
        let id = self.add_customer(email);
        Ok(Customer {
            id,
            email: Some(email.to_string()),
        })
    }

    async fn list_active_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Subscription>, BillingError> {
        self.enter()?;
        // Mirrors the provider's status=active filter; period end is not checked here
        Ok(self
            .read()
            .subscriptions
            .iter()
            .filter(|s| s.customer_id == customer_id && s.status == SubscriptionState::Active)
            .cloned()
            .collect())
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        self.enter()?;
        let mut state = self.write();
        let id = state.next_id("cs");
        state.checkouts.push(request);
        Ok(CheckoutSession {
            url: format!("https://checkout.mock/{}", id),
            id,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError> {
        self.enter()?;
        if !self.read().customers.iter().any(|c| c.id == customer_id) {
            return Err(BillingError::NotFound(format!(
                "No such customer: {}",
                customer_id
            )));
        }
        Ok(PortalSession {
            url: format!("https://portal.mock/{}?return_url={}", customer_id, return_url),
        })
    }

    async fn list_plans(&self) -> Result<Vec<Plan>, BillingError> {
        self.enter()?;
        let mut plans: Vec<Plan> = self
            .read()
            .plans
            .values()
            .filter(|p| p.active)
            .cloned()
            .collect();
        sort_plans(&mut plans);
        Ok(plans)
    }

    async fn create_plan(&self, plan: NewPlan) -> Result<Plan, BillingError> {
        self.enter()?;
        let mut state = self.write();
        let id = state.next_id("prod");
        let created = Plan {
            price_id: Some(format!("price_{}", id)),
            id: id.clone(),
            name: plan.name,
            description: plan.description,
            unit_amount: Some(plan.unit_amount),
            currency: Some(plan.currency.to_lowercase()),
            interval: Some(plan.interval),
            active: true,
        };
        state.plans.insert(id, created.clone());
        Ok(created)
    }

    async fn update_plan(&self, plan_id: &str, update: PlanUpdate) -> Result<Plan, BillingError> {
        self.enter()?;
        let mut state = self.write();
        let plan = state
            .plans
            .get_mut(plan_id)
            .ok_or_else(|| BillingError::NotFound(format!("No such product: {}", plan_id)))?;
        if let Some(name) = update.name {
            plan.name = name;
        }
        if let Some(description) = update.description {
            plan.description = Some(description);
        }
        Ok(plan.clone())
    }

    async fn archive_plan(&self, plan_id: &str) -> Result<Plan, BillingError> {
        self.enter()?;
        let mut state = self.write();
        let plan = state
            .plans
            .get_mut(plan_id)
            .ok_or_else(|| BillingError::NotFound(format!("No such product: {}", plan_id)))?;
        plan.active = false;
        Ok(plan.clone())
    }
}
