//! Route definitions for Catalog domain API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{techniques, translate};
use super::middleware::CatalogState;

/// Create technique routes
fn technique_routes() -> Router<CatalogState> {
    Router::new()
        .route(
            "/v1/techniques",
            get(techniques::list_techniques).post(techniques::create_technique),
        )
        .route(
            "/v1/techniques/{id}",
            get(techniques::get_technique)
                .patch(techniques::update_technique)
                .delete(techniques::delete_technique),
        )
}

/// Create translation routes
fn translate_routes() -> Router<CatalogState> {
    Router::new().route("/functions/v1/translate", post(translate::translate))
}

/// Create all Catalog domain API routes
pub fn routes() -> Router<CatalogState> {
    Router::new()
        .merge(technique_routes())
        .merge(translate_routes())
}
