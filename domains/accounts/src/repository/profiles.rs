//! Profile repository

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{normalize_email, Profile};
use tatame_common::RepositoryError;

/// Storage for `profiles`
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, RepositoryError>;

    async fn find_by_billing_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Profile>, RepositoryError>;

    /// Insert the profile or refresh its email, keeping the billing link
    async fn upsert(&self, id: Uuid, email: &str) -> Result<Profile, RepositoryError>;

    /// Returns `None` when no profile has this id
    async fn set_billing_customer_id(
        &self,
        id: Uuid,
        customer_id: Option<&str>,
    ) -> Result<Option<Profile>, RepositoryError>;

    /// Newest first; `search` matches a substring of the email
    async fn list(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Profile>, i64), RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, billing_customer_id, created_at, updated_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, billing_customer_id, created_at, updated_at
            FROM profiles
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn find_by_billing_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, billing_customer_id, created_at, updated_at
            FROM profiles
            WHERE billing_customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn upsert(&self, id: Uuid, email: &str) -> Result<Profile, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                updated_at = NOW()
            RETURNING id, email, billing_customer_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(normalize_email(email))
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn set_billing_customer_id(
        &self,
        id: Uuid,
        customer_id: Option<&str>,
    ) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET
                billing_customer_id = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, billing_customer_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn list(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Profile>, i64), RepositoryError> {
        let pattern = search.map(|s| format!("%{}%", s.trim().to_lowercase()));

        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, billing_customer_id, created_at, updated_at
            FROM profiles
            WHERE ($1::text IS NULL OR email LIKE $1)
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM profiles
            WHERE ($1::text IS NULL OR email LIKE $1)
            "#,
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok((profiles, total))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        // user_roles rows go with the profile (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
