//! Shared utilities, configuration, and error handling for Tatame
//!
//! This crate provides common functionality used across the Tatame backend:
//! - Configuration management following 12-factor principles
//! - Error types and their HTTP mapping
//! - Request extractors (validated JSON, pagination)
//! - Webhook signature helpers

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod extractors;

pub use crypto::{compute_hmac_sha256, verify_hmac_sha256};
pub use db::RepositoryError;
pub use error::{Error, Result};
pub use extractors::{Page, Pagination, ValidatedJson};
