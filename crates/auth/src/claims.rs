//! JWT claims types

use serde::{Deserialize, Serialize};

/// Postgres role carried by signed-in session tokens
pub(crate) const AUTHENTICATED_ROLE: &str = "authenticated";

/// Session token claims issued by the identity provider (Supabase GoTrue)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Email
    pub email: Option<String>,
    /// Issued at
    pub iat: u64,
    /// Expires at
    pub exp: u64,
    /// Audience
    pub aud: String,
    /// Database role: `authenticated` for users, `anon`/`service_role` for keys
    pub role: String,
    /// Identity provider session this token belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl SupabaseClaims {
    /// Whether the token belongs to a signed-in user rather than a project key
    pub fn is_user_session(&self) -> bool {
        self.role == AUTHENTICATED_ROLE
    }
}
