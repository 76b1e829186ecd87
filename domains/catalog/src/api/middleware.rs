//! Catalog domain state and auth backend integration

use axum::extract::FromRef;
use tatame_auth::AuthBackend;

use crate::domain::translation::Translator;
use crate::CatalogRepositories;

/// Application state for the Catalog domain
#[derive(Clone)]
pub struct CatalogState {
    pub repos: CatalogRepositories,
    pub auth: AuthBackend,
    pub translator: Translator,
}

impl FromRef<CatalogState> for AuthBackend {
    fn from_ref(state: &CatalogState) -> Self {
        state.auth.clone()
    }
}
