//! Listing criteria for techniques

use serde::Deserialize;

use super::entities::{Technique, DEFAULT_LOCALE};

/// Sort key for technique listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechniqueSort {
    /// Curated order, as arranged by admins
    #[default]
    DisplayOrder,
    /// Alphabetical in the requested locale
    Name,
    /// Newest first
    Newest,
}

/// Filters for listing techniques; all optional
#[derive(Debug, Clone, Default)]
pub struct TechniqueQuery {
    pub category: Option<String>,
    /// Case-insensitive substring of any name or description
    pub search: Option<String>,
    pub locale: Option<String>,
    pub sort: TechniqueSort,
}

impl TechniqueQuery {
    pub fn locale(&self) -> &str {
        self.locale.as_deref().unwrap_or(DEFAULT_LOCALE)
    }

    pub fn normalized_category(&self) -> Option<String> {
        self.category
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
    }

    pub fn normalized_search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }

    pub fn matches(&self, technique: &Technique) -> bool {
        if let Some(category) = self.normalized_category() {
            if technique.category != category {
                return false;
            }
        }
        if let Some(needle) = self.normalized_search() {
            let found = technique
                .names
                .values()
                .chain(technique.descriptions.values())
                .any(|text| text.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }
        true
    }

    /// Order `techniques` by the requested key; ties break on id
    pub fn sort(&self, techniques: &mut [Technique]) {
        let locale = self.locale();
        match self.sort {
            TechniqueSort::DisplayOrder => techniques.sort_by(|a, b| {
                a.display_order
                    .cmp(&b.display_order)
                    .then_with(|| a.id.cmp(&b.id))
            }),
            TechniqueSort::Name => techniques.sort_by(|a, b| {
                a.name_in(locale)
                    .to_lowercase()
                    .cmp(&b.name_in(locale).to_lowercase())
                    .then_with(|| a.id.cmp(&b.id))
            }),
            TechniqueSort::Newest => techniques.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }
    }
}
