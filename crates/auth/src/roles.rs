//! Server-side role resolution
//!
//! Role membership is not embedded in session tokens, so every
//! privileged request asks the role directory again.

use sqlx::PgPool;
use uuid::Uuid;

use crate::types::AppRole;

/// Failure while reading role assignments
#[derive(Debug, Clone, thiserror::Error)]
#[error("role lookup failed: {0}")]
pub struct RoleLookupError(pub String);

/// Read access to the role-assignment table.
///
/// A user holds a role iff at least one `(user_id, role)` row exists.
#[async_trait::async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn has_role(&self, user_id: Uuid, role: AppRole) -> Result<bool, RoleLookupError>;
}

/// Role directory backed by the `user_roles` table
#[derive(Clone)]
pub struct PgRoleDirectory {
    pool: PgPool,
}

impl PgRoleDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RoleDirectory for PgRoleDirectory {
    async fn has_role(&self, user_id: Uuid, role: AppRole) -> Result<bool, RoleLookupError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_roles
                WHERE user_id = $1 AND role = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RoleLookupError(e.to_string()))?;

        Ok(exists)
    }
}
