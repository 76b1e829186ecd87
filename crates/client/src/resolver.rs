//! Role and Subscription Resolvers
//!
//! Both fail closed: any error, missing session or expired token yields
//! `false`/unsubscribed and is logged rather than surfaced.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::backend::{AccessBackend, SubscriptionStatus};
use crate::session::SessionState;

/// Answers "is the current user an admin"
#[derive(Clone)]
pub struct RoleResolver {
    backend: Arc<dyn AccessBackend>,
}

impl RoleResolver {
    pub fn new(backend: Arc<dyn AccessBackend>) -> Self {
        Self { backend }
    }

    pub async fn is_admin(&self, state: &SessionState, now: DateTime<Utc>) -> bool {
        let Some(session) = state.session.as_ref() else {
            return false;
        };
        if session.is_expired_at(now) {
            tracing::debug!(user_id = %session.user.id, "Session expired, not admin");
            return false;
        }

        match self.backend.whoami(&session.access_token).await {
            // Role must belong to the session's user
            Ok(me) if me.id == session.user.id => me.is_admin,
            Ok(me) => {
                tracing::warn!(
                    session_user = %session.user.id,
                    resolved_user = %me.id,
                    "Role lookup answered for a different user"
                );
                false
            }
            Err(e) => {
                tracing::warn!(user_id = %session.user.id, error = %e, "Role lookup failed");
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CachedStatus {
    generation: u64,
    status: SubscriptionStatus,
}

/// Answers "is the current user's subscription active", caching per session
#[derive(Clone)]
pub struct SubscriptionResolver {
    backend: Arc<dyn AccessBackend>,
    cache: Arc<Mutex<Option<CachedStatus>>>,
}

impl SubscriptionResolver {
    pub fn new(backend: Arc<dyn AccessBackend>) -> Self {
        Self {
            backend,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    fn cached(&self, generation: u64, now: DateTime<Utc>) -> Option<SubscriptionStatus> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .as_ref()
            .filter(|c| c.generation == generation && !c.status.is_stale_at(now))
            .map(|c| c.status.clone())
    }

    fn store(&self, generation: u64, status: SubscriptionStatus) {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = Some(CachedStatus {
            generation,
            status,
        });
    }

    /// Drop the cached answer so the next check asks the backend
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub async fn check(&self, state: &SessionState, now: DateTime<Utc>) -> SubscriptionStatus {
        let Some(session) = state.session.as_ref() else {
            return SubscriptionStatus::unsubscribed();
        };
        if session.is_expired_at(now) {
            tracing::debug!(user_id = %session.user.id, "Session expired, not subscribed");
            self.invalidate();
            return SubscriptionStatus::unsubscribed();
        }

        if let Some(status) = self.cached(state.generation, now) {
            return status;
        }

        match self.backend.check_subscription(&session.access_token).await {
            Ok(status) => {
                let status = if status.is_stale_at(now) {
                    SubscriptionStatus::unsubscribed()
                } else {
                    status
                };
                self.store(state.generation, status.clone());
                status
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %session.user.id,
                    error = %e,
                    "Subscription check failed"
                );
                SubscriptionStatus::unsubscribed()
            }
        }
    }

    /// Force a fresh check for the given session
    pub async fn refresh(&self, state: &SessionState, now: DateTime<Utc>) -> SubscriptionStatus {
        self.invalidate();
        self.check(state, now).await
    }
}
