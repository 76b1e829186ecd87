//! Repository implementations for the Accounts domain

pub mod memory;
pub mod profiles;
pub mod roles;

use std::sync::Arc;

use sqlx::PgPool;
use tatame_auth::RoleDirectory;

pub use memory::{MemoryProfileStore, MemoryRoleStore};
pub use profiles::{PgProfileStore, ProfileStore};
pub use roles::{PgRoleStore, RoleStore};

/// Combined repository access for the Accounts domain
#[derive(Clone)]
pub struct AccountsRepositories {
    pub profiles: Arc<dyn ProfileStore>,
    pub roles: Arc<dyn RoleStore>,
}

impl AccountsRepositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            profiles: Arc::new(PgProfileStore::new(pool.clone())),
            roles: Arc::new(PgRoleStore::new(pool)),
        }
    }

    /// In-memory stores plus the role directory reading the same rows
    pub fn in_memory() -> (Self, Arc<dyn RoleDirectory>) {
        let roles = MemoryRoleStore::new();
        let repos = Self {
            profiles: Arc::new(MemoryProfileStore::new()),
            roles: Arc::new(roles.clone()),
        };
        (repos, Arc::new(roles))
    }
}
