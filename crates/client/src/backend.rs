//! Typed calls to the Tatame backend used by the resolvers

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// `GET /v1/auth/whoami`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoAmI {
    pub id: Uuid,
    pub email: Option<String>,
    pub is_admin: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// `check-subscription` result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub subscribed: bool,
    pub product_id: Option<String>,
    pub subscription_end: Option<DateTime<Utc>>,
}

impl SubscriptionStatus {
    pub fn unsubscribed() -> Self {
        Self::default()
    }

    /// A positive answer whose period has since ended
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.subscribed && self.subscription_end.is_some_and(|end| end <= now)
    }
}

/// Backend endpoints the access resolvers depend on
#[async_trait::async_trait]
pub trait AccessBackend: Send + Sync {
    async fn whoami(&self, access_token: &str) -> Result<WhoAmI, ClientError>;

    async fn check_subscription(&self, access_token: &str)
        -> Result<SubscriptionStatus, ClientError>;
}

pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_base_url.clone(),
        }
    }

    async fn read<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_response(status, &body));
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::Upstream(format!("Malformed backend response: {}", e)))
    }
}

#[async_trait::async_trait]
impl AccessBackend for BackendClient {
    async fn whoami(&self, access_token: &str) -> Result<WhoAmI, ClientError> {
        let response = self
            .client
            .get(format!("{}/v1/auth/whoami", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn check_subscription(
        &self,
        access_token: &str,
    ) -> Result<SubscriptionStatus, ClientError> {
        let response = self
            .client
            .post(format!("{}/functions/v1/check-subscription", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::read(response).await
    }
}
