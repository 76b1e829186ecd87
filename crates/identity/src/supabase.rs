//! Supabase Auth (GoTrue) admin API implementation
//!
//! Uses the `/auth/v1/admin/users` endpoints authenticated with the
//! project's service role key.

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{IdentityError, IdentityService, IdentityUser};

/// GoTrue error bodies vary between versions
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl ErrorBody {
    fn message(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.error_description.clone())
            .unwrap_or_default()
    }

    fn is_duplicate(&self) -> bool {
        matches!(
            self.error_code.as_deref(),
            Some("email_exists") | Some("user_already_exists")
        ) || self.message().to_lowercase().contains("already been registered")
    }
}

/// Supabase identity service implementation
pub struct SupabaseIdentityService {
    client: Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseIdentityService {
    pub fn new(base_url: String, service_role_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_role_key,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    fn users_url(&self) -> String {
        format!("{}/auth/v1/admin/users", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, IdentityError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| IdentityError::Request(format!("HTTP request failed: {}", e)))?;
        Self::check(response).await
    }

    /// Map a non-success provider response to an [`IdentityError`]
    async fn check(response: Response) -> Result<Response, IdentityError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let raw = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        let body: ErrorBody = serde_json::from_str(&raw).unwrap_or_default();
        let message = match body.message() {
            m if m.is_empty() => format!("Supabase Auth returned {}: {}", status, raw),
            m => m,
        };

        tracing::debug!(status = %status, error_code = ?body.error_code, "Identity provider error");

        if body.is_duplicate() {
            return Err(IdentityError::AlreadyExists(message));
        }

        Err(match status.as_u16() {
            404 => IdentityError::NotFound(message),
            400 | 422 => IdentityError::Rejected(message),
            _ => IdentityError::Response(message),
        })
    }
}

#[async_trait::async_trait]
impl IdentityService for SupabaseIdentityService {
    async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentityUser, IdentityError> {
        let response = self
            .send(self.client.post(self.users_url()).json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            })))
            .await?;

        let user: IdentityUser = response
            .json()
            .await
            .map_err(|e| IdentityError::Response(format!("Failed to parse user: {}", e)))?;

        tracing::info!(user_id = %user.id, "Created identity user");
        Ok(user)
    }

    async fn update_password(&self, user_id: Uuid, password: &str) -> Result<(), IdentityError> {
        self.send(
            self.client
                .put(format!("{}/{}", self.users_url(), user_id))
                .json(&json!({ "password": password })),
        )
        .await?;

        tracing::info!(user_id = %user_id, "Updated identity user password");
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), IdentityError> {
        self.send(
            self.client
                .delete(format!("{}/{}", self.users_url(), user_id)),
        )
        .await?;

        tracing::info!(user_id = %user_id, "Deleted identity user");
        Ok(())
    }

    async fn verify_session(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<bool, IdentityError> {
        // Sent with the user's own token, not the service role
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.service_role_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| IdentityError::Request(format!("HTTP request failed: {}", e)))?;

        if matches!(response.status().as_u16(), 401 | 403) {
            tracing::debug!(user_id = %user_id, status = %response.status(), "Session refused by identity provider");
            return Ok(false);
        }

        let user: IdentityUser = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| IdentityError::Response(format!("Failed to parse user: {}", e)))?;

        Ok(user.id == user_id)
    }
}
