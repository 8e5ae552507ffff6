use super::{Context, DispatchOptions, Entity, EntityId, Message, MessageId, NotifyOptions, UserId};
use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};

/// 队列任务：可续投的一段工作
///
/// 只引用已持久化的消息；携带推导好的上下文与游标，续投时无需重新计算。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueTask {
    pub message_id: MessageId,
    pub entity_type: String,
    pub entity_id: EntityId,
    pub notify_options: NotifyOptions,
    /// 投递选项快照，`last_user_id` 即游标
    pub subscribe_options: DispatchOptions,
    pub context: Context,
    /// 游标的冗余副本
    pub cursor_user_id: Option<UserId>,
}

impl QueueTask {
    /// 未持久化的消息不能入队
    pub fn new(
        message: &Message,
        entity: &Entity,
        notify_options: NotifyOptions,
        subscribe_options: DispatchOptions,
        context: Context,
    ) -> DomainResult<Self> {
        let Some(message_id) = message.id() else {
            return Err(DomainError::invalid_state(
                "cannot add a non saved message to the queue",
            ));
        };

        Ok(Self {
            message_id,
            entity_type: entity.entity_type().to_string(),
            entity_id: entity.id(),
            notify_options,
            cursor_user_id: subscribe_options.last_user_id,
            subscribe_options,
            context,
        })
    }

    /// 游标取快照与冗余副本中的较大者
    pub fn cursor(&self) -> Option<UserId> {
        self.subscribe_options.last_user_id.max(self.cursor_user_id)
    }
}
