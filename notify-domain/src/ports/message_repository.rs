//! 消息仓储（MessageRepository）
//!
use crate::{
    error::DomainResult as Result,
    model::{Message, MessageId},
};
use async_trait::async_trait;

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 保存消息：无 ID 时新增，否则覆盖；返回消息 ID
    async fn save(&self, message: &Message) -> Result<MessageId>;

    /// 消息不存在时返回 `Ok(None)`
    async fn load(&self, id: MessageId) -> Result<Option<Message>>;
}
