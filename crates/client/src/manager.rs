//! Session lifecycle: sign-in, sign-out and silent refresh

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tokio::task::JoinHandle;

use crate::error::ClientError;
use crate::provider::SessionProvider;
use crate::session::{Session, SessionStore};

/// Drives a `SessionStore` from a `SessionProvider`.
///
/// Provider failures never leave a half-valid session behind: the store is
/// cleared and the error handed back for the shell to show. A rejected
/// sign-in keeps a session that is still valid.
#[derive(Clone)]
pub struct SessionManager {
    store: SessionStore,
    provider: Arc<dyn SessionProvider>,
    refresh_margin: Duration,
}

impl SessionManager {
    pub fn new(
        store: SessionStore,
        provider: Arc<dyn SessionProvider>,
        refresh_margin: StdDuration,
    ) -> Self {
        Self {
            store,
            provider,
            refresh_margin: Duration::from_std(refresh_margin).unwrap_or(Duration::seconds(60)),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Adopt a session restored from storage, or mark that there is none
    pub fn restore(&self, session: Option<Session>) {
        let session = session.filter(|s| !s.is_expired_at(Utc::now()));
        self.store.replace(session);
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), ClientError> {
        match self.provider.sign_in_with_password(email, password).await {
            Ok(session) => {
                tracing::info!(user_id = %session.user.id, "Signed in");
                self.store.replace(Some(session));
                Ok(())
            }
            Err(e) => {
                // Rejected credentials do not end a session that is still valid
                let keep_current = !e.is_unavailable()
                    && self
                        .store
                        .current()
                        .is_some_and(|current| !current.is_expired_at(Utc::now()));
                if keep_current {
                    tracing::warn!(error = %e, "Sign-in rejected, keeping current session");
                } else {
                    tracing::warn!(error = %e, "Sign-in failed");
                    self.store.clear();
                }
                Err(e)
            }
        }
    }

    /// Register and, when the provider issues one right away, start the session
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<bool, ClientError> {
        match self.provider.sign_up(email, password).await {
            Ok(Some(session)) => {
                self.store.replace(Some(session));
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                tracing::warn!(error = %e, "Sign-up failed");
                Err(e)
            }
        }
    }

    /// End the session locally, then tell the provider.
    ///
    /// The local session is gone even if the provider call fails.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let current = self.store.current();
        self.store.clear();

        if let Some(session) = current {
            if let Err(e) = self.provider.sign_out(&session.access_token).await {
                tracing::warn!(error = %e, "Provider sign-out failed");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Refresh when the token is within the margin of expiry.
    ///
    /// Returns whether a refresh happened.
    pub async fn refresh_if_needed(&self) -> Result<bool, ClientError> {
        let Some(session) = self.store.current() else {
            return Ok(false);
        };

        if !session.expires_within(self.refresh_margin, Utc::now()) {
            return Ok(false);
        }

        let generation = self.store.generation();
        match self.provider.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                // A sign-in or sign-out during the call wins
                if self.store.generation() != generation {
                    tracing::debug!("Discarding refresh for superseded session");
                    return Ok(false);
                }
                tracing::debug!(user_id = %refreshed.user.id, "Session refreshed");
                self.store.replace(Some(refreshed));
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed, signing out locally");
                if self.store.generation() == generation {
                    self.store.clear();
                }
                Err(e)
            }
        }
    }

    /// Check for refresh on a fixed interval until the handle is aborted
    pub fn spawn_refresh_loop(&self, every: StdDuration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                // Errors are already logged and reflected in the store
                let _ = manager.refresh_if_needed().await;
            }
        })
    }
}
