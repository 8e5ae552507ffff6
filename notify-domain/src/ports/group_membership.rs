//! 分组关系（GroupMembership）
//!
//! 可选子系统：未提供时上下文推导直接跳过分组这一项。
//!
use crate::{
    error::DomainResult as Result,
    model::{EntityId, EntityRef},
};
use async_trait::async_trait;

#[async_trait]
pub trait GroupMembership: Send + Sync {
    /// 返回实体所属的分组
    async fn groups_of(&self, entity_type: &str, id: EntityId) -> Result<Vec<EntityRef>>;
}
