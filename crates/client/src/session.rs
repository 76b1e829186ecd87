//! Session Store
//!
//! Single source of truth for the current visitor. The session lives in a
//! `tokio::sync::watch` cell and is only ever replaced whole; every
//! replacement bumps a generation number so results computed for an older
//! session can be recognised and dropped.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

/// Authenticated user carried by a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Identity provider session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the token expires within `margin` of `now`
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at - margin <= now
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// One published value of the store
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub generation: u64,
    /// False until the shell has restored or established a session
    pub resolved: bool,
    pub session: Option<Arc<Session>>,
}

/// Observable, replace-only session cell
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Store whose session is not known yet
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Last published state (synchronous)
    pub fn state(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Last published session, if any
    pub fn current(&self) -> Option<Arc<Session>> {
        self.tx.borrow().session.clone()
    }

    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    /// Replace the session and notify observers; returns the new generation
    pub fn replace(&self, session: Option<Session>) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|state| {
            state.generation += 1;
            state.resolved = true;
            state.session = session.map(Arc::new);
            generation = state.generation;
        });
        tracing::debug!(generation, "Session replaced");
        generation
    }

    /// Drop the session (logout or provider failure)
    pub fn clear(&self) -> u64 {
        self.replace(None)
    }

    /// Start a new observation; it yields the current state first
    pub fn observe(&self) -> SessionWatcher {
        SessionWatcher {
            rx: self.tx.subscribe(),
            started: false,
        }
    }
}

/// Restartable sequence of session states
#[derive(Debug)]
pub struct SessionWatcher {
    rx: watch::Receiver<SessionState>,
    started: bool,
}

impl SessionWatcher {
    /// Wait for the next state. Intermediate replacements that happen while
    /// nobody is waiting are coalesced into the latest one.
    pub async fn next(&mut self) -> Option<SessionState> {
        if !self.started {
            self.started = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}


#[cfg(test)]
pub(crate) use tests::session as test_session;
