//! Mock Identity Service Implementation
//!
//! In-memory user directory used when the provider is `"mock"` and by
//! router tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::{IdentityError, IdentityService, IdentityUser};

#[derive(Debug, Clone)]
struct MockAccount {
    user: IdentityUser,
    password: String,
}

#[derive(Debug, Default)]
struct MockState {
    accounts: Vec<MockAccount>,
    /// Users whose sessions the provider no longer honours
    signed_out: HashSet<Uuid>,
    unavailable: bool,
}

/// Mock identity service for testing
#[derive(Debug, Clone, Default)]
pub struct MockIdentityService {
    state: Arc<Mutex<MockState>>,
}

impl MockIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Lock the state, failing if an outage is simulated
    fn available(&self) -> Result<MutexGuard<'_, MockState>, IdentityError> {
        let state = self.lock();
        if state.unavailable {
            return Err(IdentityError::Request(
                "Mock identity provider unavailable".to_string(),
            ));
        }
        Ok(state)
    }

    /// Simulate the provider being unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Look up a user by id
    pub fn user(&self, user_id: Uuid) -> Option<IdentityUser> {
        self.lock()
            .accounts
            .iter()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone())
    }

    /// Current password of a user, for assertions
    pub fn password_of(&self, user_id: Uuid) -> Option<String> {
        self.lock()
            .accounts
            .iter()
            .find(|a| a.user.id == user_id)
            .map(|a| a.password.clone())
    }

    pub fn user_count(&self) -> usize {
        self.lock().accounts.len()
    }

    /// End every session of a user, as a provider-side sign-out does
    pub fn sign_out_user(&self, user_id: Uuid) {
        self.lock().signed_out.insert(user_id);
    }
}

#[async_trait::async_trait]
impl IdentityService for MockIdentityService {
    async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentityUser, IdentityError> {
        let mut state = self.available()?;
        let email = email.trim().to_lowercase();

        if state
            .accounts
            .iter()
            .any(|a| a.user.email.as_deref() == Some(email.as_str()))
        {
            return Err(IdentityError::AlreadyExists(email));
        }

        let user = IdentityUser {
            id: Uuid::new_v4(),
            email: Some(email),
            created_at: Utc::now(),
            last_sign_in_at: None,
        };
        state.accounts.push(MockAccount {
            user: user.clone(),
            password: password.to_string(),
        });
        Ok(user)
    }

    async fn update_password(&self, user_id: Uuid, password: &str) -> Result<(), IdentityError> {
        let mut state = self.available()?;
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.user.id == user_id)
            .ok_or_else(|| IdentityError::NotFound(user_id.to_string()))?;
        account.password = password.to_string();
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), IdentityError> {
        let mut state = self.available()?;
        let before = state.accounts.len();
        state.accounts.retain(|a| a.user.id != user_id);
        if state.accounts.len() == before {
            return Err(IdentityError::NotFound(user_id.to_string()));
        }
        state.signed_out.insert(user_id);
        Ok(())
    }

    /// Tokens are not issued by the mock, so any token of a user who has
    /// not been signed out or deleted is honoured
    async fn verify_session(
        &self,
        _access_token: &str,
        user_id: Uuid,
    ) -> Result<bool, IdentityError> {
        let state = self.available()?;
        Ok(!state.signed_out.contains(&user_id))
    }
}
