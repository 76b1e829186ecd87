//! Accounts domain state and auth backend integration

use std::sync::Arc;

use axum::extract::FromRef;
use tatame_auth::AuthBackend;
use tatame_billing::BillingService;
use tatame_identity::IdentityService;

use crate::AccountsRepositories;

/// Redirect targets handed to the payment provider
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub success_url: String,
    pub cancel_url: String,
    pub portal_return_url: String,
}

impl CheckoutConfig {
    /// Standard redirect pages under the web application's base URL
    pub fn for_app(app_base_url: &str) -> Self {
        let base = app_base_url.trim_end_matches('/');
        Self {
            success_url: format!("{}/assinatura/sucesso", base),
            cancel_url: format!("{}/planos", base),
            portal_return_url: format!("{}/perfil", base),
        }
    }
}

/// Application state for the Accounts domain
#[derive(Clone)]
pub struct AccountsState {
    pub repos: AccountsRepositories,
    pub auth: AuthBackend,
    pub billing: Arc<dyn BillingService>,
    pub identity: Arc<dyn IdentityService>,
    pub checkout: CheckoutConfig,
    /// Signing secret for provider webhooks; unset disables the endpoint
    pub webhook_secret: Option<String>,
}

impl FromRef<AccountsState> for AuthBackend {
    fn from_ref(state: &AccountsState) -> Self {
        state.auth.clone()
    }
}
