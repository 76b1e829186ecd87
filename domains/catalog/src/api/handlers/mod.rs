//! HTTP handlers for the Catalog domain

pub mod techniques;
pub mod translate;
