use crate::{
    error::DomainResult as Result,
    model::{Entity, EntityId, UserId},
    ports::AccessChecker,
};
use async_trait::async_trait;
use dashmap::DashSet;

/// 默认放行，仅拒绝显式登记的（用户, 实体）组合
#[derive(Debug, Default)]
pub struct DenyListAccess {
    denied: DashSet<(UserId, String, EntityId)>,
}

impl DenyListAccess {
    pub fn deny(&self, user_id: UserId, entity_type: &str, id: EntityId) {
        self.denied.insert((user_id, entity_type.to_string(), id));
    }
}

#[async_trait]
impl AccessChecker for DenyListAccess {
    async fn can_view(&self, user_id: UserId, entity: &Entity) -> Result<bool> {
        let key = (user_id, entity.entity_type().to_string(), entity.id());
        Ok(!self.denied.contains(&key))
    }
}
