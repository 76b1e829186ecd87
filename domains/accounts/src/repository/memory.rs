//! In-memory stores for local development and tests
//!
//! Same contracts as the Postgres stores. Every check-then-write runs
//! under a single lock. Writes can be switched to fail like a lost
//! database connection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::entities::{normalize_email, Profile, RoleAssignment};
use crate::repository::profiles::ProfileStore;
use crate::repository::roles::RoleStore;
use tatame_auth::{AppRole, RoleDirectory, RoleLookupError};
use tatame_common::RepositoryError;

fn unavailable() -> RepositoryError {
    RepositoryError::Connection(sqlx::Error::PoolTimedOut)
}

#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Arc<Mutex<HashMap<Uuid, Profile>>>,
    failing_writes: Arc<AtomicBool>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a connection error
    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    fn writable(&self) -> Result<(), RepositoryError> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Profile>> {
        self.profiles.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, RepositoryError> {
        let email = normalize_email(email);
        Ok(self.lock().values().find(|p| p.email == email).cloned())
    }

    async fn find_by_billing_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Profile>, RepositoryError> {
        Ok(self
            .lock()
            .values()
            .find(|p| p.billing_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn upsert(&self, id: Uuid, email: &str) -> Result<Profile, RepositoryError> {
        self.writable()?;
        let mut profiles = self.lock();
        let profile = profiles
            .entry(id)
            .and_modify(|p| {
                p.email = normalize_email(email);
                p.updated_at = Utc::now();
            })
            .or_insert_with(|| Profile::new(id, email));
        Ok(profile.clone())
    }

    async fn set_billing_customer_id(
        &self,
        id: Uuid,
        customer_id: Option<&str>,
    ) -> Result<Option<Profile>, RepositoryError> {
        self.writable()?;
        let mut profiles = self.lock();
        Ok(profiles.get_mut(&id).map(|p| {
            p.billing_customer_id = customer_id.map(str::to_string);
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn list(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Profile>, i64), RepositoryError> {
        let needle = search.map(|s| s.trim().to_lowercase());
        let mut matching: Vec<Profile> = self
            .lock()
            .values()
            .filter(|p| needle.as_deref().is_none_or(|n| p.email.contains(n)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.writable()?;
        Ok(self.lock().remove(&id).is_some())
    }
}

#[derive(Clone, Default)]
pub struct MemoryRoleStore {
    rows: Arc<Mutex<Vec<RoleAssignment>>>,
    failing_writes: Arc<AtomicBool>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a connection error
    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    fn writable(&self) -> Result<(), RepositoryError> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RoleAssignment>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Total number of stored rows, duplicates included
    pub fn row_count(&self) -> usize {
        self.lock().len()
    }
}

fn holds(rows: &[RoleAssignment], user_id: Uuid, role: AppRole) -> bool {
    rows.iter().any(|r| r.user_id == user_id && r.role == role)
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn has_role(&self, user_id: Uuid, role: AppRole) -> Result<bool, RepositoryError> {
        Ok(holds(&self.lock(), user_id, role))
    }

    async fn grant(&self, user_id: Uuid, role: AppRole) -> Result<bool, RepositoryError> {
        self.writable()?;
        let mut rows = self.lock();
        if holds(&rows, user_id, role) {
            return Ok(false);
        }
        rows.push(RoleAssignment::new(user_id, role));
        Ok(true)
    }

    async fn revoke(&self, user_id: Uuid, role: AppRole) -> Result<bool, RepositoryError> {
        self.writable()?;
        let mut rows = self.lock();
        let before = rows.len();
        rows.retain(|r| !(r.user_id == user_id && r.role == role));
        Ok(rows.len() < before)
    }

    async fn revoke_all(&self, user_id: Uuid) -> Result<(), RepositoryError> {
        self.writable()?;
        self.lock().retain(|r| r.user_id != user_id);
        Ok(())
    }

    async fn admin_exists(&self) -> Result<bool, RepositoryError> {
        Ok(self.lock().iter().any(|r| r.role == AppRole::Admin))
    }

    async fn admins_among(&self, user_ids: &[Uuid]) -> Result<HashSet<Uuid>, RepositoryError> {
        let wanted: HashSet<&Uuid> = user_ids.iter().collect();
        Ok(self
            .lock()
            .iter()
            .filter(|r| r.role == AppRole::Admin && wanted.contains(&r.user_id))
            .map(|r| r.user_id)
            .collect())
    }

    async fn bootstrap_first_admin(&self, user_id: Uuid) -> Result<bool, RepositoryError> {
        self.writable()?;
        let mut rows = self.lock();
        if rows.iter().any(|r| r.role == AppRole::Admin) {
            return Ok(false);
        }
        rows.push(RoleAssignment::new(user_id, AppRole::Admin));
        Ok(true)
    }
}

#[async_trait]
impl RoleDirectory for MemoryRoleStore {
    async fn has_role(&self, user_id: Uuid, role: AppRole) -> Result<bool, RoleLookupError> {
        Ok(holds(&self.lock(), user_id, role))
    }
}
