use crate::{
    error::DomainResult as Result,
    model::{Entity, EntityId},
    ports::EntityLoader,
};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct InMemoryEntityLoader {
    entities: DashMap<(String, EntityId), Entity>,
}

impl InMemoryEntityLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entity: Entity) {
        self.entities
            .insert((entity.entity_type().to_string(), entity.id()), entity);
    }

    pub fn remove(&self, entity_type: &str, id: EntityId) -> Option<Entity> {
        self.entities
            .remove(&(entity_type.to_string(), id))
            .map(|(_, entity)| entity)
    }
}

#[async_trait]
impl EntityLoader for InMemoryEntityLoader {
    async fn load(&self, entity_type: &str, id: EntityId) -> Result<Option<Entity>> {
        Ok(self
            .entities
            .get(&(entity_type.to_string(), id))
            .map(|e| e.value().clone()))
    }
}
