//! Technique API handlers
//!
//! Implements:
//! - GET /v1/techniques - Public listing (no video URLs)
//! - GET /v1/techniques/{id} - Full technique for signed-in users
//! - POST /v1/techniques - Create (admin)
//! - PATCH /v1/techniques/{id} - Update (admin)
//! - DELETE /v1/techniques/{id} - Delete (admin)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tatame_auth::{AdminUser, AuthUser};
use tatame_common::{Error, Page, Pagination, Result, ValidatedJson};
use uuid::Uuid;
use validator::Validate;

use crate::api::middleware::CatalogState;
use crate::domain::entities::{
    is_supported_locale, LocalizedText, NewTechnique, Technique, TechniquePatch,
};
use crate::domain::query::{TechniqueQuery, TechniqueSort};

/// Query parameters for listing techniques
#[derive(Debug, Deserialize, Default)]
pub struct TechniqueListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub locale: Option<String>,
    #[serde(default)]
    pub sort: TechniqueSort,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// Catalog card; what visitors see before subscribing
#[derive(Debug, Serialize)]
pub struct TechniqueSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub thumbnail_url: Option<String>,
    pub has_video: bool,
    pub display_order: i32,
}

impl TechniqueSummary {
    fn new(technique: &Technique, locale: &str) -> Self {
        Self {
            id: technique.id,
            name: technique.name_in(locale).to_string(),
            description: technique.description_in(locale).map(str::to_string),
            category: technique.category.clone(),
            thumbnail_url: technique.thumbnail_url.clone(),
            has_video: technique.video_url.is_some(),
            display_order: technique.display_order,
        }
    }
}

/// Full technique
#[derive(Debug, Serialize)]
pub struct TechniqueResponse {
    pub id: Uuid,
    pub names: LocalizedText,
    pub descriptions: LocalizedText,
    pub category: String,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Technique> for TechniqueResponse {
    fn from(t: Technique) -> Self {
        Self {
            id: t.id,
            names: t.names.0,
            descriptions: t.descriptions.0,
            category: t.category,
            video_url: t.video_url,
            thumbnail_url: t.thumbnail_url,
            display_order: t.display_order,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Request for creating a technique
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTechniqueRequest {
    pub names: LocalizedText,

    #[serde(default)]
    pub descriptions: LocalizedText,

    #[validate(length(min = 1, max = 50))]
    pub category: String,

    #[validate(url)]
    pub video_url: Option<String>,

    #[validate(url)]
    pub thumbnail_url: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub display_order: i32,
}

/// Request for updating a technique; absent fields are left unchanged and
/// `null` clears the URLs
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTechniqueRequest {
    pub names: Option<LocalizedText>,

    pub descriptions: Option<LocalizedText>,

    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub video_url: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub thumbnail_url: Option<Option<String>>,

    #[validate(range(min = 0))]
    pub display_order: Option<i32>,
}

/// Distinguish `"field": null` from an absent field
fn nullable<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl From<UpdateTechniqueRequest> for TechniquePatch {
    fn from(req: UpdateTechniqueRequest) -> Self {
        Self {
            names: req.names,
            descriptions: req.descriptions,
            category: req.category,
            video_url: req.video_url,
            thumbnail_url: req.thumbnail_url,
            display_order: req.display_order,
        }
    }
}

fn technique_not_found() -> Error {
    Error::NotFound("Technique not found".to_string())
}

/// GET /v1/techniques
pub async fn list_techniques(
    State(state): State<CatalogState>,
    Query(params): Query<TechniqueListQuery>,
) -> Result<Json<Page<TechniqueSummary>>> {
    if let Some(locale) = params.locale.as_deref() {
        if !is_supported_locale(locale) {
            return Err(Error::Validation(format!("Unsupported locale: {}", locale)));
        }
    }

    let pagination = Pagination {
        offset: params.offset,
        limit: params.limit,
    };
    let query = TechniqueQuery {
        category: params.category,
        search: params.search,
        locale: params.locale,
        sort: params.sort,
    };

    let (techniques, total) = state
        .repos
        .techniques
        .list(&query, pagination.offset(), pagination.limit())
        .await?;

    let locale = query.locale();
    let page = Page::new(techniques, total, pagination).map(|t| TechniqueSummary::new(&t, locale));

    Ok(Json(page))
}

/// GET /v1/techniques/{id}
pub async fn get_technique(
    State(state): State<CatalogState>,
    AuthUser(_ctx): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TechniqueResponse>> {
    let technique = state
        .repos
        .techniques
        .get(id)
        .await?
        .ok_or_else(technique_not_found)?;

    Ok(Json(technique.into()))
}

/// POST /v1/techniques
pub async fn create_technique(
    State(state): State<CatalogState>,
    AdminUser(ctx): AdminUser,
    ValidatedJson(req): ValidatedJson<CreateTechniqueRequest>,
) -> Result<(StatusCode, Json<TechniqueResponse>)> {
    let technique = Technique::new(NewTechnique {
        names: req.names,
        descriptions: req.descriptions,
        category: req.category,
        video_url: req.video_url,
        thumbnail_url: req.thumbnail_url,
        display_order: req.display_order,
    })?;

    let created = state.repos.techniques.create(&technique).await?;

    tracing::info!(admin_id = %ctx.user_id(), technique_id = %created.id, "Technique created");

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// PATCH /v1/techniques/{id}
pub async fn update_technique(
    State(state): State<CatalogState>,
    AdminUser(ctx): AdminUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTechniqueRequest>,
) -> Result<Json<TechniqueResponse>> {
    let mut technique = state
        .repos
        .techniques
        .get(id)
        .await?
        .ok_or_else(technique_not_found)?;

    technique.apply(req.into())?;

    let updated = state
        .repos
        .techniques
        .update(&technique)
        .await?
        .ok_or_else(technique_not_found)?;

    tracing::info!(admin_id = %ctx.user_id(), technique_id = %id, "Technique updated");

    Ok(Json(updated.into()))
}

/// DELETE /v1/techniques/{id}
pub async fn delete_technique(
    State(state): State<CatalogState>,
    AdminUser(ctx): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.repos.techniques.delete(id).await? {
        return Err(technique_not_found());
    }

    tracing::info!(admin_id = %ctx.user_id(), technique_id = %id, "Technique deleted");

    Ok(StatusCode::NO_CONTENT)
}
