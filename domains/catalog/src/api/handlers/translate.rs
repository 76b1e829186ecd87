//! Translation API handler
//!
//! Implements:
//! - POST /functions/v1/translate - Translate technique text (admin)

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tatame_auth::AdminUser;
use tatame_common::{Error, Result, ValidatedJson};
use validator::{Validate, ValidationError};

use crate::api::middleware::CatalogState;
use crate::domain::entities::{is_supported_locale, DEFAULT_LOCALE};
use crate::domain::translation::TranslationError;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: String,

    #[serde(default = "default_source")]
    #[validate(custom(function = "validate_locale", message = "Unsupported locale"))]
    pub source_locale: String,

    #[validate(
        length(min = 1, max = 3),
        custom(function = "validate_locales", message = "Unsupported locale")
    )]
    pub target_locales: Vec<String>,
}

fn default_source() -> String {
    DEFAULT_LOCALE.to_string()
}

fn validate_locale(locale: &str) -> std::result::Result<(), ValidationError> {
    if is_supported_locale(locale) {
        Ok(())
    } else {
        Err(ValidationError::new("unsupported_locale"))
    }
}

fn validate_locales(locales: &[String]) -> std::result::Result<(), ValidationError> {
    locales.iter().try_for_each(|l| validate_locale(l))
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub translations: BTreeMap<String, String>,
}

/// POST /functions/v1/translate
pub async fn translate(
    State(state): State<CatalogState>,
    AdminUser(ctx): AdminUser,
    ValidatedJson(req): ValidatedJson<TranslateRequest>,
) -> Result<Json<TranslateResponse>> {
    let translations = state
        .translator
        .translate(&req.text, &req.source_locale, &req.target_locales)
        .await
        .map_err(|e| {
            tracing::error!(admin_id = %ctx.user_id(), error = %e, "Translation failed");
            match e {
                TranslationError::Gateway(e) => Error::Upstream(e.to_string()),
                TranslationError::MalformedReply(msg) => {
                    Error::Upstream(format!("Unusable translation: {}", msg))
                }
            }
        })?;

    Ok(Json(TranslateResponse { translations }))
}
