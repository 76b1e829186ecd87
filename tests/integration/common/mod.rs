//! Common test utilities and fixtures for integration tests
//!
//! Builds the full application router over in-memory stores and the mock
//! providers, mints session tokens the way the identity provider does and
//! wraps request/response plumbing.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use tatame_accounts::{
    AccountsRepositories, CheckoutConfig, MemoryProfileStore, MemoryRoleStore, ProfileStore,
    RoleStore,
};
use tatame_app::{compose, AppParts};
use tatame_auth::{AppRole, AuthBackend, AuthConfig, SupabaseClaims};
use tatame_billing::mock::MockBillingService;
use tatame_catalog::CatalogRepositories;
use tatame_identity::mock::MockIdentityService;
use tatame_llm::mock::MockLlmService;

pub const JWT_SECRET: &str = "test_secret_key_for_testing_only"; // pragma: allowlist secret
pub const JWT_ISSUER: &str = "https://auth.tatame.test/auth/v1";
pub const JWT_AUDIENCE: &str = "authenticated";
pub const WEBHOOK_SECRET: &str = "whsec_integration"; // pragma: allowlist secret

/// Test application with handles on every backing store and provider
pub struct TestApp {
    pub router: Router,
    pub accounts: AccountsRepositories,
    /// Concrete stores behind `accounts`, for fault injection
    pub profile_store: MemoryProfileStore,
    pub role_store: MemoryRoleStore,
    pub catalog: CatalogRepositories,
    pub billing: MockBillingService,
    pub identity: MockIdentityService,
    pub llm: MockLlmService,
}

/// A signed-in user as the API sees them
#[derive(Debug, Clone)]
pub struct UserFixture {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(Some(WEBHOOK_SECRET.to_string()))
    }

    /// App with no webhook endpoint secret configured
    pub fn without_webhook_secret() -> Self {
        Self::build(None)
    }

    fn build(webhook_secret: Option<String>) -> Self {
        let profile_store = MemoryProfileStore::new();
        let role_store = MemoryRoleStore::new();
        let accounts = AccountsRepositories {
            profiles: Arc::new(profile_store.clone()),
            roles: Arc::new(role_store.clone()),
        };
        let catalog = CatalogRepositories::in_memory();
        let billing = MockBillingService::new();
        let identity = MockIdentityService::new();
        let llm = MockLlmService::new();

        let auth = AuthBackend::new(
            AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
                issuer: Some(JWT_ISSUER.to_string()),
                audience: Some(JWT_AUDIENCE.to_string()),
            },
            Arc::new(role_store.clone()),
        );

        let router = compose(AppParts {
            auth,
            accounts: accounts.clone(),
            catalog: catalog.clone(),
            billing: Arc::new(billing.clone()),
            identity: Arc::new(identity.clone()),
            llm: Arc::new(llm.clone()),
            checkout: CheckoutConfig::for_app("https://tatame.test"),
            webhook_secret,
        });

        Self {
            router,
            accounts,
            profile_store,
            role_store,
            catalog,
            billing,
            identity,
            llm,
        }
    }

    /// Register a signed-in user with a profile row
    pub async fn create_user(&self) -> Result<UserFixture> {
        let id = Uuid::new_v4();
        let email = format!("aluno_{}@tatame.test", id.simple());
        self.accounts.profiles.upsert(id, &email).await?;
        Ok(UserFixture {
            token: mint_token(id, Some(&email), Duration::hours(1)),
            id,
            email,
        })
    }

    /// Register a signed-in user holding the admin role
    pub async fn create_admin(&self) -> Result<UserFixture> {
        let user = self.create_user().await?;
        self.accounts.roles.grant(user.id, AppRole::Admin).await?;
        Ok(user)
    }

    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.accounts.roles.has_role(user_id, AppRole::Admin).await?)
    }

    /// Send a request through the full router
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::PATCH, uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::DELETE, uri, token, None)).await
    }
}

/// Build a JSON request with an optional bearer token
pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("valid request")
}

/// Mint a session token for `user_id`, valid for `ttl` (negative for expired)
pub fn mint_token(user_id: Uuid, email: Option<&str>, ttl: Duration) -> String {
    mint_claims(SupabaseClaims {
        sub: user_id.to_string(),
        email: email.map(str::to_string),
        iat: Utc::now().timestamp() as u64,
        exp: (Utc::now() + ttl).timestamp() as u64,
        aud: JWT_AUDIENCE.to_string(),
        role: "authenticated".to_string(),
        session_id: Some(Uuid::new_v4().to_string()),
    })
}

#[derive(serde::Serialize)]
struct IssuedClaims<'a> {
    #[serde(flatten)]
    claims: &'a SupabaseClaims,
    iss: &'a str,
}

pub fn mint_claims(claims: SupabaseClaims) -> String {
    encode(
        &Header::default(),
        &IssuedClaims {
            claims: &claims,
            iss: JWT_ISSUER,
        },
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token encodes")
}

/// Assert the `{"error": {"code", "message"}}` body shape
pub fn assert_error_body(body: &Value) {
    assert!(
        body["error"]["code"].is_string(),
        "missing error code in {}",
        body
    );
    assert!(
        body["error"]["message"].is_string(),
        "missing error message in {}",
        body
    );
}
