use crate::{
    error::DomainResult as Result,
    model::{EntityId, EntityRef},
    ports::GroupMembership,
};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct InMemoryGroupMembership {
    groups: DashMap<(String, EntityId), Vec<EntityRef>>,
}

impl InMemoryGroupMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, entity_type: &str, id: EntityId, group: EntityRef) {
        self.groups
            .entry((entity_type.to_string(), id))
            .or_default()
            .push(group);
    }
}

#[async_trait]
impl GroupMembership for InMemoryGroupMembership {
    async fn groups_of(&self, entity_type: &str, id: EntityId) -> Result<Vec<EntityRef>> {
        Ok(self
            .groups
            .get(&(entity_type.to_string(), id))
            .map(|g| g.value().clone())
            .unwrap_or_default())
    }
}
