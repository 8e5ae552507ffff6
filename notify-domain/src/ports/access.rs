//! 查看权限（AccessChecker）
//!
use crate::{
    error::DomainResult as Result,
    model::{Entity, UserId},
};
use async_trait::async_trait;

/// 判断用户能否查看事件实体；无权限的候选用户会被静默排除
#[async_trait]
pub trait AccessChecker: Send + Sync {
    async fn can_view(&self, user_id: UserId, entity: &Entity) -> Result<bool>;
}
