//! 实体加载（EntityLoader）
//!
//! 供上下文推导加载相关容器实体、供队列 worker 按引用重新加载事件实体。
//!
use crate::{
    error::DomainResult as Result,
    model::{Entity, EntityId},
};
use async_trait::async_trait;

#[async_trait]
pub trait EntityLoader: Send + Sync {
    /// 实体不存在（如已删除）时返回 `Ok(None)`
    async fn load(&self, entity_type: &str, id: EntityId) -> Result<Option<Entity>>;
}
