//! Identity provider session API (Supabase Auth / GoTrue)

use chrono::{Duration, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::{Session, SessionUser};

/// Session lifecycle operations of the identity provider
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, ClientError>;

    /// Register an account; `None` when the provider requires email
    /// confirmation before issuing a session
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, ClientError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ClientError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), ClientError>;
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: SessionUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
            user: self.user,
        }
    }
}

/// Signup answers with a session, or with the bare user when confirmation is pending
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(SessionUser),
}

#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    msg: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
}

pub struct GoTrueSessionProvider {
    client: Client,
    auth_url: String,
    anon_key: String,
}

impl GoTrueSessionProvider {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            auth_url: config.auth_url.clone(),
            anon_key: config.anon_key.clone(),
        }
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}/auth/v1/{}", self.auth_url, path))
            .header("apikey", &self.anon_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail: ProviderError = serde_json::from_str(&body).unwrap_or_default();
        let message = detail
            .msg
            .or(detail.error_description)
            .or(detail.message)
            .unwrap_or_else(|| format!("HTTP {}", status));

        Err(if status.is_server_error() {
            ClientError::Upstream(message)
        } else if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::UNAUTHORIZED
        {
            // Wrong password and revoked refresh tokens both land here
            ClientError::Unauthenticated(message)
        } else {
            ClientError::Validation(message)
        })
    }
}

#[async_trait::async_trait]
impl SessionProvider for GoTrueSessionProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let response = self
            .send(
                self.post("token")
                    .query(&[("grant_type", "password")])
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        let token: TokenResponse = response.json().await?;
        Ok(token.into_session())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, ClientError> {
        let response = self
            .send(
                self.post("signup")
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        match response.json().await? {
            SignUpResponse::Session(token) => Ok(Some(token.into_session())),
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "Signup pending email confirmation");
                Ok(None)
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ClientError> {
        let response = self
            .send(
                self.post("token")
                    .query(&[("grant_type", "refresh_token")])
                    .json(&json!({ "refresh_token": refresh_token })),
            )
            .await?;
        let token: TokenResponse = response.json().await?;
        Ok(token.into_session())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ClientError> {
        self.send(self.post("logout").bearer_auth(access_token))
            .await?;
        Ok(())
    }
}
