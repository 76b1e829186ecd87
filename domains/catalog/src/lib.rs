//! Catalog domain: BJJ techniques, listing, translation

pub mod api;
pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{
    LocalizedText, NewTechnique, Technique, TechniquePatch, DEFAULT_LOCALE, SUPPORTED_LOCALES,
};
pub use domain::query::{TechniqueQuery, TechniqueSort};
pub use domain::translation::{TranslationError, Translator};

// Re-export repository types
pub use repository::{CatalogRepositories, MemoryTechniqueStore, PgTechniqueStore, TechniqueStore};

// Re-export API types
pub use api::routes;
pub use api::CatalogState;
