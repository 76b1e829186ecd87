//! Access Gate
//!
//! One declarative decision for every protected surface. `decide` is a
//! pure function of the requirements and the resolver outputs, so pages
//! never re-implement role or paywall checks.

use serde::{Deserialize, Serialize};

/// Where forbidden visitors are sent; never an error page
pub const SAFE_DEFAULT_ROUTE: &str = "/";

/// What a surface needs before it renders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirements {
    pub requires_auth: bool,
    pub requires_admin: bool,
    pub requires_subscription: bool,
}

impl AccessRequirements {
    pub const fn public() -> Self {
        Self {
            requires_auth: false,
            requires_admin: false,
            requires_subscription: false,
        }
    }

    pub const fn authenticated() -> Self {
        Self {
            requires_auth: true,
            requires_admin: false,
            requires_subscription: false,
        }
    }

    /// Technique videos and other paid content
    pub const fn subscriber() -> Self {
        Self {
            requires_auth: true,
            requires_admin: false,
            requires_subscription: true,
        }
    }

    /// Admin console
    pub const fn admin() -> Self {
        Self {
            requires_auth: true,
            requires_admin: true,
            requires_subscription: false,
        }
    }

    fn needs_session(&self) -> bool {
        self.requires_auth || self.requires_admin || self.requires_subscription
    }
}

/// Whether a session exists, as far as the store knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPresence {
    Unknown,
    Absent,
    Present,
}

/// Resolver outputs; `None` means that check is still in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessInputs {
    pub session: SessionPresence,
    pub is_admin: Option<bool>,
    pub subscribed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AccessDecision {
    /// Render a non-interactive placeholder
    Loading,
    /// Redirect to login, then back to `return_to`
    Unauthenticated { return_to: String },
    /// Redirect to a neutral route
    Forbidden { redirect_to: String },
    /// Render the upgrade prompt in place of the content
    PaywallBlocked,
    Granted,
}

/// Decide the outcome for `path` under `requirements`
pub fn decide(requirements: AccessRequirements, inputs: AccessInputs, path: &str) -> AccessDecision {
    if !requirements.needs_session() {
        return AccessDecision::Granted;
    }

    match inputs.session {
        SessionPresence::Unknown => return AccessDecision::Loading,
        SessionPresence::Absent => {
            return AccessDecision::Unauthenticated {
                return_to: path.to_string(),
            }
        }
        SessionPresence::Present => {}
    }

    if requirements.requires_admin || requirements.requires_subscription {
        match inputs.is_admin {
            None => return AccessDecision::Loading,
            Some(false) if requirements.requires_admin => {
                return AccessDecision::Forbidden {
                    redirect_to: SAFE_DEFAULT_ROUTE.to_string(),
                }
            }
            _ => {}
        }
    }

    if requirements.requires_subscription {
        // Admins see paid content without a subscription
        if inputs.is_admin == Some(true) {
            return AccessDecision::Granted;
        }
        return match inputs.subscribed {
            None => AccessDecision::Loading,
            Some(false) => AccessDecision::PaywallBlocked,
            Some(true) => AccessDecision::Granted,
        };
    }

    AccessDecision::Granted
}
