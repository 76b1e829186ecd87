//! Domain entities for the Catalog domain
//!
//! A technique carries its text in several locales. Portuguese is the
//! source language and must always be present; other locales fall back
//! to it when missing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use tatame_common::{Error, Result};

/// Locale every technique is written in first
pub const DEFAULT_LOCALE: &str = "pt";

/// Locales the catalog is published in
pub const SUPPORTED_LOCALES: [&str; 3] = ["pt", "en", "es"];

/// Maximum technique name length
const MAX_NAME_LENGTH: usize = 200;

/// Maximum technique description length
const MAX_DESCRIPTION_LENGTH: usize = 5000;

/// Maximum category length
const MAX_CATEGORY_LENGTH: usize = 50;

/// Locale code → text
pub type LocalizedText = BTreeMap<String, String>;

pub fn is_supported_locale(locale: &str) -> bool {
    SUPPORTED_LOCALES.contains(&locale)
}

/// Technique entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Technique {
    pub id: Uuid,
    pub names: Json<LocalizedText>,
    pub descriptions: Json<LocalizedText>,
    pub category: String,
    /// Paid content; only rendered for subscribers and admins
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new technique
#[derive(Debug, Clone, Default)]
pub struct NewTechnique {
    pub names: LocalizedText,
    pub descriptions: LocalizedText,
    pub category: String,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub display_order: i32,
}

/// Partial update; `None` leaves the field unchanged, `Some(None)` clears
/// an optional field
#[derive(Debug, Clone, Default)]
pub struct TechniquePatch {
    pub names: Option<LocalizedText>,
    pub descriptions: Option<LocalizedText>,
    pub category: Option<String>,
    pub video_url: Option<Option<String>>,
    pub thumbnail_url: Option<Option<String>>,
    pub display_order: Option<i32>,
}

impl Technique {
    /// Create a new technique
    pub fn new(input: NewTechnique) -> Result<Self> {
        Self::validate_names(&input.names)?;
        Self::validate_descriptions(&input.descriptions)?;
        Self::validate_category(&input.category)?;

        let now = Utc::now();
        Ok(Technique {
            id: Uuid::new_v4(),
            names: Json(input.names),
            descriptions: Json(input.descriptions),
            category: input.category.trim().to_lowercase(),
            video_url: input.video_url,
            thumbnail_url: input.thumbnail_url,
            display_order: input.display_order,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update, validating the result
    pub fn apply(&mut self, patch: TechniquePatch) -> Result<()> {
        if let Some(names) = patch.names {
            Self::validate_names(&names)?;
            self.names = Json(names);
        }
        if let Some(descriptions) = patch.descriptions {
            Self::validate_descriptions(&descriptions)?;
            self.descriptions = Json(descriptions);
        }
        if let Some(category) = patch.category {
            Self::validate_category(&category)?;
            self.category = category.trim().to_lowercase();
        }
        if let Some(video_url) = patch.video_url {
            self.video_url = video_url;
        }
        if let Some(thumbnail_url) = patch.thumbnail_url {
            self.thumbnail_url = thumbnail_url;
        }
        if let Some(display_order) = patch.display_order {
            self.display_order = display_order;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Name in `locale`, falling back to Portuguese
    pub fn name_in(&self, locale: &str) -> &str {
        localized(&self.names, locale).unwrap_or_default()
    }

    pub fn description_in(&self, locale: &str) -> Option<&str> {
        localized(&self.descriptions, locale)
    }

    fn validate_names(names: &LocalizedText) -> Result<()> {
        let source = names.get(DEFAULT_LOCALE).map(|n| n.trim()).unwrap_or("");
        if source.is_empty() {
            return Err(Error::Validation(
                "A Portuguese name (pt) is required".to_string(),
            ));
        }
        Self::validate_localized(names, MAX_NAME_LENGTH, "Name")
    }

    fn validate_descriptions(descriptions: &LocalizedText) -> Result<()> {
        Self::validate_localized(descriptions, MAX_DESCRIPTION_LENGTH, "Description")
    }

    fn validate_localized(text: &LocalizedText, max: usize, field: &str) -> Result<()> {
        for (locale, value) in text {
            if !is_supported_locale(locale) {
                return Err(Error::Validation(format!("Unsupported locale: {}", locale)));
            }
            if value.chars().count() > max {
                return Err(Error::Validation(format!(
                    "{} must be at most {} characters",
                    field, max
                )));
            }
        }
        Ok(())
    }

    fn validate_category(category: &str) -> Result<()> {
        let category = category.trim();
        if category.is_empty() {
            return Err(Error::Validation("Category is required".to_string()));
        }
        if category.len() > MAX_CATEGORY_LENGTH {
            return Err(Error::Validation(format!(
                "Category must be at most {} characters",
                MAX_CATEGORY_LENGTH
            )));
        }
        Ok(())
    }
}

fn localized<'a>(text: &'a LocalizedText, locale: &str) -> Option<&'a str> {
    text.get(locale)
        .filter(|t| !t.trim().is_empty())
        .or_else(|| text.get(DEFAULT_LOCALE))
        .map(String::as_str)
}
