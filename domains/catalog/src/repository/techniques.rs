//! Technique repository

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::Technique;
use crate::domain::query::{TechniqueQuery, TechniqueSort};
use tatame_common::RepositoryError;

/// Storage for `techniques`
#[async_trait]
pub trait TechniqueStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Technique>, RepositoryError>;

    /// One page of matching techniques plus the total match count
    async fn list(
        &self,
        query: &TechniqueQuery,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Technique>, i64), RepositoryError>;

    async fn create(&self, technique: &Technique) -> Result<Technique, RepositoryError>;

    /// Persist every mutable field; `None` when the technique is gone
    async fn update(&self, technique: &Technique) -> Result<Option<Technique>, RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

#[derive(Clone)]
pub struct PgTechniqueStore {
    pool: PgPool,
}

impl PgTechniqueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn order_clause(sort: TechniqueSort) -> &'static str {
    match sort {
        TechniqueSort::DisplayOrder => "display_order ASC, id",
        TechniqueSort::Name => "LOWER(COALESCE(NULLIF(names ->> $3, ''), names ->> 'pt')) ASC, id",
        TechniqueSort::Newest => "created_at DESC, id",
    }
}

#[async_trait]
impl TechniqueStore for PgTechniqueStore {
    async fn get(&self, id: Uuid) -> Result<Option<Technique>, RepositoryError> {
        let technique = sqlx::query_as::<_, Technique>(
            r#"
            SELECT id, names, descriptions, category, video_url, thumbnail_url,
                   display_order, created_at, updated_at
            FROM techniques
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(technique)
    }

    async fn list(
        &self,
        query: &TechniqueQuery,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Technique>, i64), RepositoryError> {
        let category = query.normalized_category();
        let pattern = query.normalized_search().map(|s| format!("%{}%", s));

        // $1 category, $2 search pattern, $3 locale; the locale is bound
        // even when unused so placeholders stay stable
        let filter = r#"
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL
                   OR EXISTS (SELECT 1 FROM jsonb_each_text(names) n WHERE LOWER(n.value) LIKE $2)
                   OR EXISTS (SELECT 1 FROM jsonb_each_text(descriptions) d WHERE LOWER(d.value) LIKE $2))
              AND $3::text IS NOT NULL
        "#;

        let select = format!(
            r#"
            SELECT id, names, descriptions, category, video_url, thumbnail_url,
                   display_order, created_at, updated_at
            FROM techniques
            {}
            ORDER BY {}
            LIMIT $4 OFFSET $5
            "#,
            filter,
            order_clause(query.sort)
        );

        let techniques = sqlx::query_as::<_, Technique>(&select)
            .bind(category.as_deref())
            .bind(pattern.as_deref())
            .bind(query.locale())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let count = format!("SELECT COUNT(*) FROM techniques {}", filter);
        let total: i64 = sqlx::query_scalar(&count)
            .bind(category.as_deref())
            .bind(pattern.as_deref())
            .bind(query.locale())
            .fetch_one(&self.pool)
            .await?;

        Ok((techniques, total))
    }

    async fn create(&self, technique: &Technique) -> Result<Technique, RepositoryError> {
        let created = sqlx::query_as::<_, Technique>(
            r#"
            INSERT INTO techniques (
                id, names, descriptions, category, video_url, thumbnail_url,
                display_order, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, names, descriptions, category, video_url, thumbnail_url,
                      display_order, created_at, updated_at
            "#,
        )
        .bind(technique.id)
        .bind(&technique.names)
        .bind(&technique.descriptions)
        .bind(&technique.category)
        .bind(&technique.video_url)
        .bind(&technique.thumbnail_url)
        .bind(technique.display_order)
        .bind(technique.created_at)
        .bind(technique.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(&self, technique: &Technique) -> Result<Option<Technique>, RepositoryError> {
        let updated = sqlx::query_as::<_, Technique>(
            r#"
            UPDATE techniques SET
                names = $2,
                descriptions = $3,
                category = $4,
                video_url = $5,
                thumbnail_url = $6,
                display_order = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, names, descriptions, category, video_url, thumbnail_url,
                      display_order, created_at, updated_at
            "#,
        )
        .bind(technique.id)
        .bind(&technique.names)
        .bind(&technique.descriptions)
        .bind(&technique.category)
        .bind(&technique.video_url)
        .bind(&technique.thumbnail_url)
        .bind(technique.display_order)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM techniques WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
