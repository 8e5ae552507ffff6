use crate::{
    error::DomainResult as Result,
    model::{EntityId, FlagId, UserId},
    ports::{Subscription, SubscriptionFlag, SubscriptionQuery, SubscriptionStore},
};
use async_trait::async_trait;
use parking_lot::RwLock;

/// 内存订阅存储
#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    flags: RwLock<Vec<SubscriptionFlag>>,
    rows: RwLock<Vec<Subscription>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 定义订阅标记；同名同类型的标记已存在时返回已有 ID
    pub fn define_flag(&self, name: &str, entity_type: &str) -> FlagId {
        let mut flags = self.flags.write();
        if let Some(existing) = flags
            .iter()
            .find(|f| f.name == name && f.entity_type == entity_type)
        {
            return existing.id;
        }
        let id = flags.len() as FlagId + 1;
        flags.push(SubscriptionFlag {
            id,
            name: name.to_string(),
            entity_type: entity_type.to_string(),
        });
        id
    }

    /// 登记订阅行（重复登记忽略）
    pub fn subscribe(
        &self,
        flag_id: FlagId,
        entity_type: &str,
        entity_id: EntityId,
        user_id: UserId,
    ) {
        let row = Subscription {
            flag_id,
            entity_type: entity_type.to_string(),
            entity_id,
            user_id,
        };
        let mut rows = self.rows.write();
        if !rows.contains(&row) {
            rows.push(row);
        }
    }

    pub fn unsubscribe(
        &self,
        flag_id: FlagId,
        entity_type: &str,
        entity_id: EntityId,
        user_id: UserId,
    ) {
        self.rows.write().retain(|r| {
            !(r.flag_id == flag_id
                && r.entity_type == entity_type
                && r.entity_id == entity_id
                && r.user_id == user_id)
        });
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn flags(&self) -> Result<Vec<SubscriptionFlag>> {
        Ok(self.flags.read().clone())
    }

    async fn find(&self, query: &SubscriptionQuery) -> Result<Vec<Subscription>> {
        let mut matched: Vec<Subscription> = self
            .rows
            .read()
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            (a.user_id, a.flag_id, &a.entity_type, a.entity_id)
                .cmp(&(b.user_id, b.flag_id, &b.entity_type, b.entity_id))
        });
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}
