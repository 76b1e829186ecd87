//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config. Provider selection
//! (`BILLING_PROVIDER`, `IDENTITY_PROVIDER`, `LLM_PROVIDER`) defaults to
//! `mock` so a local server boots without third-party credentials.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL (Supabase PostgreSQL)
    pub database_url: String,

    /// Session token verification
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,

    /// Identity provider (supabase, mock)
    pub identity_provider: String,
    pub supabase_url: Option<String>,
    pub supabase_service_role_key: Option<String>,

    /// Payment provider (stripe, mock)
    pub billing_provider: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,

    /// LLM gateway used for translations (gateway, mock)
    pub llm_provider: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: String,

    /// Public URL of the web application (checkout and portal redirects)
    pub app_base_url: String,
    pub cors_allowed_origins: String,

    /// Runtime configuration
    pub log_level: String,
    pub rust_log: String,
    pub port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("identity_provider", &self.identity_provider)
            .field("supabase_url", &self.supabase_url)
            .field("billing_provider", &self.billing_provider)
            .field("llm_provider", &self.llm_provider)
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .field("app_base_url", &self.app_base_url)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("port", &self.port)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?,

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET is required"))?,
            jwt_issuer: env::var("JWT_ISSUER").ok(),
            jwt_audience: env::var("JWT_AUDIENCE").ok(),

            identity_provider: env::var("IDENTITY_PROVIDER")
                .unwrap_or_else(|_| "mock".to_string()),
            supabase_url: env::var("SUPABASE_URL").ok(),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),

            billing_provider: env::var("BILLING_PROVIDER").unwrap_or_else(|_| "mock".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").ok(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok(),

            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "mock".to_string()),
            llm_api_key: env::var("LLM_API_KEY").ok(),
            llm_base_url: env::var("LLM_BASE_URL").ok(),
            llm_model: env::var("LLM_MODEL")
                .unwrap_or_else(|_| "google/gemini-2.5-flash".to_string()),

            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "tatame=debug".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
        };

        config.validate()?;

        Ok(config)
    }

    /// Check that every selected provider has the credentials it needs
    pub fn validate(&self) -> Result<()> {
        if self.identity_provider == "supabase"
            && (self.supabase_url.is_none() || self.supabase_service_role_key.is_none())
        {
            anyhow::bail!(
                "SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY are required when IDENTITY_PROVIDER=supabase"
            );
        }

        if self.billing_provider == "stripe"
            && (self.stripe_secret_key.is_none() || self.stripe_webhook_secret.is_none())
        {
            anyhow::bail!(
                "STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET are required when BILLING_PROVIDER=stripe"
            );
        }

        if self.llm_provider == "gateway" && self.llm_api_key.is_none() {
            anyhow::bail!("LLM_API_KEY is required when LLM_PROVIDER=gateway");
        }

        Ok(())
    }
}
