//! Role assignment repository

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use tatame_auth::AppRole;
use tatame_common::RepositoryError;

/// Storage for `user_roles`.
///
/// `(user_id, role)` is unique, so granting twice leaves one row.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn has_role(&self, user_id: Uuid, role: AppRole) -> Result<bool, RepositoryError>;

    /// `true` when a row was inserted, `false` when it already existed
    async fn grant(&self, user_id: Uuid, role: AppRole) -> Result<bool, RepositoryError>;

    /// `true` when a row was removed
    async fn revoke(&self, user_id: Uuid, role: AppRole) -> Result<bool, RepositoryError>;

    async fn revoke_all(&self, user_id: Uuid) -> Result<(), RepositoryError>;

    async fn admin_exists(&self) -> Result<bool, RepositoryError>;

    /// Subset of `user_ids` holding the admin role
    async fn admins_among(&self, user_ids: &[Uuid]) -> Result<HashSet<Uuid>, RepositoryError>;

    /// Make `user_id` the first admin.
    ///
    /// Check and insert happen atomically: of any number of concurrent
    /// callers against an admin-less table exactly one gets `true`, and
    /// once an admin exists every caller gets `false`.
    async fn bootstrap_first_admin(&self, user_id: Uuid) -> Result<bool, RepositoryError>;
}

#[derive(Clone)]
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn has_role(&self, user_id: Uuid, role: AppRole) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_roles WHERE user_id = $1 AND role = $2)",
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn grant(&self, user_id: Uuid, role: AppRole) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (id, user_id, role, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id, role) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke(&self, user_id: Uuid, role: AppRole) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role = $2")
            .bind(user_id)
            .bind(role)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all(&self, user_id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn admin_exists(&self) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM user_roles WHERE role = 'admin')")
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn admins_among(&self, user_ids: &[Uuid]) -> Result<HashSet<Uuid>, RepositoryError> {
        if user_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM user_roles WHERE role = 'admin' AND user_id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn bootstrap_first_admin(&self, user_id: Uuid) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Conflicts with itself, so concurrent bootstraps serialize here
        sqlx::query("LOCK TABLE user_roles IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let admin_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM user_roles WHERE role = 'admin')")
                .fetch_one(&mut *tx)
                .await?;

        if admin_exists {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO user_roles (id, user_id, role, created_at)
            VALUES ($1, $2, 'admin', NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

