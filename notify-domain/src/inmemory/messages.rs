use crate::{
    error::{DomainError, DomainResult as Result},
    model::{Message, MessageId},
    ports::MessageRepository,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// 内存消息仓储；ID 从 1 开始自增，更新不存在的 ID 返回 `NotFound`
#[derive(Debug, Default)]
pub struct InMemoryMessageRepository {
    messages: DashMap<MessageId, Message>,
    last_id: AtomicU64,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn remove(&self, id: MessageId) -> Option<Message> {
        self.messages.remove(&id).map(|(_, message)| message)
    }

    /// 按 ID 升序返回全部消息
    pub fn all(&self) -> Vec<Message> {
        let mut all: Vec<Message> = self.messages.iter().map(|m| m.value().clone()).collect();
        all.sort_by_key(Message::id);
        all
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn save(&self, message: &Message) -> Result<MessageId> {
        let id = match message.id() {
            Some(id) if !self.messages.contains_key(&id) => {
                return Err(DomainError::not_found(format!("message {id}")));
            }
            Some(id) => id,
            None => self.last_id.fetch_add(1, Ordering::Relaxed) + 1,
        };
        let mut stored = message.clone();
        stored.assign_id(id);
        self.messages.insert(id, stored);
        Ok(id)
    }

    async fn load(&self, id: MessageId) -> Result<Option<Message>> {
        Ok(self.messages.get(&id).map(|m| m.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_update_keeps_the_id() {
        let repo = InMemoryMessageRepository::new();
        let mut message = Message::builder().template("t").owner(1).build();
        let id = repo.save(&message).await.unwrap();
        message.assign_id(id);
        assert_eq!(repo.save(&message).await.unwrap(), id);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.load(id).await.unwrap().and_then(|m| m.id()), Some(id));
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let repo = InMemoryMessageRepository::new();
        let message = Message::builder().id(9).template("t").owner(1).build();
        let err = repo.save(&message).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert!(repo.is_empty());
    }
}
