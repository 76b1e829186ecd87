//! Repository implementations for the Catalog domain

pub mod memory;
pub mod techniques;

use std::sync::Arc;

use sqlx::PgPool;

pub use memory::MemoryTechniqueStore;
pub use techniques::{PgTechniqueStore, TechniqueStore};

/// Combined repository access for the Catalog domain
#[derive(Clone)]
pub struct CatalogRepositories {
    pub techniques: Arc<dyn TechniqueStore>,
}

impl CatalogRepositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            techniques: Arc::new(PgTechniqueStore::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            techniques: Arc::new(MemoryTechniqueStore::new()),
        }
    }
}
