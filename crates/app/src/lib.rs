//! Tatame application composition root
//!
//! Derives per-crate configuration from the validated environment,
//! builds the provider clients and composes the domain routers into a
//! single application.

use std::sync::Arc;

use axum::{http::HeaderValue, Router};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};

use tatame_accounts::{AccountsRepositories, AccountsState, CheckoutConfig};
use tatame_auth::{AuthBackend, AuthConfig, SessionCheckError, SessionVerifier};
use tatame_billing::{BillingConfig, BillingService, BillingServiceFactory};
use tatame_catalog::{CatalogRepositories, CatalogState, Translator};
use tatame_common::config::Config;
use tatame_identity::{IdentityConfig, IdentityService, IdentityServiceFactory};
use tatame_llm::{LlmConfig, LlmService, LlmServiceFactory};
use uuid::Uuid;

/// Largest accepted request body (technique descriptions are the biggest payloads)
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Completion budget for one translation
const TRANSLATION_MAX_TOKENS: u32 = 1024;

/// Everything the routers need, already constructed
#[derive(Clone)]
pub struct AppParts {
    pub auth: AuthBackend,
    pub accounts: AccountsRepositories,
    pub catalog: CatalogRepositories,
    pub billing: Arc<dyn BillingService>,
    pub identity: Arc<dyn IdentityService>,
    pub llm: Arc<dyn LlmService>,
    pub checkout: CheckoutConfig,
    pub webhook_secret: Option<String>,
}

/// Answers admin session checks from the identity provider
pub struct IdentitySessions(pub Arc<dyn IdentityService>);

#[async_trait::async_trait]
impl SessionVerifier for IdentitySessions {
    async fn is_active(&self, access_token: &str, user_id: Uuid) -> Result<bool, SessionCheckError> {
        self.0
            .verify_session(access_token, user_id)
            .await
            .map_err(|e| SessionCheckError(e.to_string()))
    }
}

pub fn auth_config(config: &Config) -> AuthConfig {
    AuthConfig {
        jwt_secret: config.jwt_secret.clone(),
        issuer: config.jwt_issuer.clone(),
        audience: config.jwt_audience.clone(),
    }
}

pub fn billing_config(config: &Config) -> BillingConfig {
    BillingConfig {
        provider: config.billing_provider.clone(),
        secret_key: config.stripe_secret_key.clone(),
        api_base_url: None,
    }
}

pub fn identity_config(config: &Config) -> IdentityConfig {
    IdentityConfig {
        provider: config.identity_provider.clone(),
        base_url: config.supabase_url.clone(),
        service_role_key: config.supabase_service_role_key.clone(),
    }
}

pub fn llm_config(config: &Config) -> LlmConfig {
    LlmConfig {
        provider: config.llm_provider.clone(),
        api_key: config.llm_api_key.clone().unwrap_or_default(),
        base_url: config.llm_base_url.clone(),
        default_model: config.llm_model.clone(),
        max_tokens: TRANSLATION_MAX_TOKENS,
    }
}

/// Create the main application router backed by Postgres and the
/// configured providers
pub async fn create_app(config: Config, pool: PgPool) -> Result<Router, anyhow::Error> {
    let billing = BillingServiceFactory::create(billing_config(&config))?;
    let identity = IdentityServiceFactory::create(identity_config(&config))?;
    let llm = LlmServiceFactory::create(llm_config(&config))?;

    let parts = AppParts {
        auth: AuthBackend::postgres(pool.clone(), auth_config(&config)),
        accounts: AccountsRepositories::postgres(pool.clone()),
        catalog: CatalogRepositories::postgres(pool),
        billing: Arc::from(billing),
        identity: Arc::from(identity),
        llm: Arc::from(llm),
        checkout: CheckoutConfig::for_app(&config.app_base_url),
        webhook_secret: config.stripe_webhook_secret.clone(),
    };

    tracing::info!(
        billing = %config.billing_provider,
        identity = %config.identity_provider,
        llm = %config.llm_provider,
        "Providers configured"
    );

    Ok(compose(parts))
}

/// Compose domain routers with shared infrastructure routes
///
/// Admin sessions are confirmed with the identity provider in `parts`.
pub fn compose(parts: AppParts) -> Router {
    let auth = parts
        .auth
        .with_session_verifier(Arc::new(IdentitySessions(parts.identity.clone())));

    let accounts_state = AccountsState {
        repos: parts.accounts,
        auth: auth.clone(),
        billing: parts.billing,
        identity: parts.identity,
        checkout: parts.checkout,
        webhook_secret: parts.webhook_secret,
    };

    let catalog_state = CatalogState {
        repos: parts.catalog,
        auth,
        translator: Translator::new(parts.llm),
    };

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .route(
            "/",
            axum::routing::get(|| async { "Tatame API v0.0.1-SNAPSHOT" }),
        )
        .merge(tatame_accounts::routes().with_state(accounts_state))
        .merge(tatame_catalog::routes().with_state(catalog_state))
}

/// CORS for a comma-separated origin list; `*` allows any origin
pub fn build_cors_layer(origins: &str) -> CorsLayer {
    let origins = origins.trim();
    if origins == "*" {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

pub fn body_limit_layer() -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(MAX_BODY_BYTES)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
