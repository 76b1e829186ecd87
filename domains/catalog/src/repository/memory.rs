//! In-memory technique store for local development and tests

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::entities::Technique;
use crate::domain::query::TechniqueQuery;
use crate::repository::techniques::TechniqueStore;
use tatame_common::RepositoryError;

#[derive(Clone, Default)]
pub struct MemoryTechniqueStore {
    techniques: Arc<RwLock<HashMap<Uuid, Technique>>>,
}

impl MemoryTechniqueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TechniqueStore for MemoryTechniqueStore {
    async fn get(&self, id: Uuid) -> Result<Option<Technique>, RepositoryError> {
        let techniques = self.techniques.read().unwrap_or_else(|e| e.into_inner());
        Ok(techniques.get(&id).cloned())
    }

    async fn list(
        &self,
        query: &TechniqueQuery,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Technique>, i64), RepositoryError> {
        let mut matching: Vec<Technique> = {
            let techniques = self.techniques.read().unwrap_or_else(|e| e.into_inner());
            techniques
                .values()
                .filter(|t| query.matches(t))
                .cloned()
                .collect()
        };
        query.sort(&mut matching);

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn create(&self, technique: &Technique) -> Result<Technique, RepositoryError> {
        let mut techniques = self.techniques.write().unwrap_or_else(|e| e.into_inner());
        if techniques.contains_key(&technique.id) {
            return Err(RepositoryError::AlreadyExists);
        }
        techniques.insert(technique.id, technique.clone());
        Ok(technique.clone())
    }

    async fn update(&self, technique: &Technique) -> Result<Option<Technique>, RepositoryError> {
        let mut techniques = self.techniques.write().unwrap_or_else(|e| e.into_inner());
        Ok(techniques.get_mut(&technique.id).map(|stored| {
            *stored = Technique {
                created_at: stored.created_at,
                updated_at: Utc::now(),
                ..technique.clone()
            };
            stored.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut techniques = self.techniques.write().unwrap_or_else(|e| e.into_inner());
        Ok(techniques.remove(&id).is_some())
    }
}
