//! Authentication and admin authorization for the Tatame API
//!
//! Provides JWT validation, server-side role resolution, and axum
//! extractors that work with any domain state implementing `FromRef<S>`
//! for `AuthBackend`. Every privileged handler takes `AdminUser`, which
//! re-derives identity from the bearer token, confirms the session with
//! the identity provider and re-queries the role table on each request.

mod backend;
mod claims;
mod config;
mod context;
mod error;
mod extractors;
mod jwt;
mod roles;
mod sessions;
mod types;

pub use backend::AuthBackend;
pub use claims::SupabaseClaims;
pub use config::AuthConfig;
pub use context::AuthContext;
pub use error::AuthError;
pub use extractors::{AdminUser, AuthUser};
pub use roles::{PgRoleDirectory, RoleDirectory, RoleLookupError};
pub use sessions::{SessionCheckError, SessionVerifier};
pub use types::{AppRole, AuthIdentity};
