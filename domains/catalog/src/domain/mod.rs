//! Domain layer for the Catalog

pub mod entities;
pub mod query;
pub mod translation;
