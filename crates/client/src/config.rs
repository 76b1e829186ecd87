//! Client runtime configuration

use std::time::Duration;

/// Refresh the session this long before it expires
const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct ClientConfig {
    /// Tatame backend, e.g. https://api.tatame.app
    pub api_base_url: String,
    /// Identity provider project URL
    pub auth_url: String,
    /// Public project key sent as `apikey`
    pub anon_key: String,
    pub refresh_margin: Duration,
}

impl ClientConfig {
    pub fn new(
        api_base_url: impl Into<String>,
        auth_url: impl Into<String>,
        anon_key: impl Into<String>,
    ) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            refresh_margin: DEFAULT_REFRESH_MARGIN,
        }
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("auth_url", &self.auth_url)
            .field("anon_key", &"[REDACTED]")
            .field("refresh_margin", &self.refresh_margin)
            .finish()
    }
}
