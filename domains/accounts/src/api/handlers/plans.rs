//! Plan API handlers
//!
//! Implements:
//! - GET /functions/v1/plans - Active plans for the pricing page
//! - POST /functions/v1/manage-plans - Create, update or archive a plan (admin)
//!
//! Plans live in the payment provider; nothing is stored locally.

use axum::{extract::State, Json};
use serde::Deserialize;
use tatame_auth::AdminUser;
use tatame_billing::{NewPlan, Plan, PlanInterval, PlanUpdate};
use tatame_common::{Result, ValidatedJson};
use validator::{Validate, ValidationErrors};

use super::billing_error;
use crate::api::middleware::AccountsState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    /// Price in minor units (centavos)
    #[validate(range(min = 1))]
    pub unit_amount: i64,

    /// ISO 4217, lowercase
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    pub interval: PlanInterval,
}

fn default_currency() -> String {
    "brl".to_string()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanRequest {
    #[validate(length(min = 1))]
    pub plan_id: String,

    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePlanRequest {
    #[validate(length(min = 1))]
    pub plan_id: String,
}

/// Body of `manage-plans`, discriminated by `action`
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ManagePlanRequest {
    Create(CreatePlanRequest),
    Update(UpdatePlanRequest),
    Archive(ArchivePlanRequest),
}

impl Validate for ManagePlanRequest {
    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        match self {
            ManagePlanRequest::Create(request) => request.validate(),
            ManagePlanRequest::Update(request) => request.validate(),
            ManagePlanRequest::Archive(request) => request.validate(),
        }
    }
}

/// GET /functions/v1/plans
pub async fn list_plans(State(state): State<AccountsState>) -> Result<Json<Vec<Plan>>> {
    let plans = state.billing.list_plans().await.map_err(billing_error)?;
    Ok(Json(plans))
}

/// POST /functions/v1/manage-plans
pub async fn manage_plans(
    State(state): State<AccountsState>,
    AdminUser(ctx): AdminUser,
    ValidatedJson(request): ValidatedJson<ManagePlanRequest>,
) -> Result<Json<Plan>> {
    let plan = match request {
        ManagePlanRequest::Create(request) => {
            state
                .billing
                .create_plan(NewPlan {
                    name: request.name,
                    description: request.description,
                    unit_amount: request.unit_amount,
                    currency: request.currency.to_lowercase(),
                    interval: request.interval,
                })
                .await
        }
        ManagePlanRequest::Update(request) => {
            state
                .billing
                .update_plan(
                    &request.plan_id,
                    PlanUpdate {
                        name: request.name,
                        description: request.description,
                    },
                )
                .await
        }
        ManagePlanRequest::Archive(request) => state.billing.archive_plan(&request.plan_id).await,
    }
    .map_err(billing_error)?;

    tracing::info!(admin_id = %ctx.user_id(), plan_id = %plan.id, active = plan.active, "Plan changed");

    Ok(Json(plan))
}
