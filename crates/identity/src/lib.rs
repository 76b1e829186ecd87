//! Tatame Identity Service
//!
//! User administration and session verification against the identity
//! provider. Only backend handlers use this crate; the service role key it
//! needs must never reach a client.

pub mod mock;
pub mod supabase;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Identity configuration error: {0}")]
    Configuration(String),

    #[error("Identity request error: {0}")]
    Request(String),

    #[error("Identity response error: {0}")]
    Response(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    #[error("User not found: {0}")]
    NotFound(String),

    /// Provider refused the input (weak password, malformed email)
    #[error("Rejected by identity provider: {0}")]
    Rejected(String),
}

/// User account as known to the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// Identity service configuration
#[derive(Clone)]
pub struct IdentityConfig {
    /// Identity provider (supabase, mock)
    pub provider: String,
    /// Project URL, e.g. https://<ref>.supabase.co
    pub base_url: Option<String>,
    pub service_role_key: Option<String>,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Admin operations on identity provider accounts
#[async_trait::async_trait]
pub trait IdentityService: Send + Sync {
    /// Create a confirmed user with a password
    async fn create_user(&self, email: &str, password: &str)
        -> Result<IdentityUser, IdentityError>;

    async fn update_password(&self, user_id: Uuid, password: &str) -> Result<(), IdentityError>;

    async fn delete_user(&self, user_id: Uuid) -> Result<(), IdentityError>;

    /// Whether the provider still honours `access_token` as a session of
    /// `user_id`. Refused tokens are `Ok(false)`; only transport and
    /// provider failures are errors.
    async fn verify_session(&self, access_token: &str, user_id: Uuid)
        -> Result<bool, IdentityError>;
}

/// Factory for creating IdentityService implementations
pub struct IdentityServiceFactory;

impl IdentityServiceFactory {
    pub fn create(config: IdentityConfig) -> Result<Box<dyn IdentityService>, IdentityError> {
        match config.provider.as_str() {
            "supabase" => {
                tracing::info!("Creating Supabase identity service");
                let base_url = config.base_url.ok_or_else(|| {
                    IdentityError::Configuration("Supabase URL is required".to_string())
                })?;
                let service_role_key = config.service_role_key.ok_or_else(|| {
                    IdentityError::Configuration(
                        "Supabase service role key is required".to_string(),
                    )
                })?;
                Ok(Box::new(supabase::SupabaseIdentityService::new(
                    base_url,
                    service_role_key,
                )))
            }
            "mock" => {
                tracing::info!("Creating mock identity service");
                Ok(Box::new(mock::MockIdentityService::new()))
            }
            provider => Err(IdentityError::Configuration(format!(
                "Unknown identity provider: {}. Supported providers: supabase, mock",
                provider
            ))),
        }
    }
}
