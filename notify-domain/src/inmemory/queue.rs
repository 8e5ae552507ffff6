use crate::{
    error::{DomainError, DomainResult as Result},
    model::QueueTask,
    ports::TaskQueue,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// 内存任务队列
///
/// 任务以 JSON 形式保存，取出时再解码为 `QueueTask`，与外部持久化队列的往返一致。
#[derive(Debug, Default)]
pub struct InMemoryTaskQueue {
    payloads: Mutex<VecDeque<Vec<u8>>>,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.payloads.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.lock().is_empty()
    }

    /// 取出队首任务（先进先出）
    pub fn claim(&self) -> Result<Option<QueueTask>> {
        let Some(payload) = self.payloads.lock().pop_front() else {
            return Ok(None);
        };
        decode(&payload).map(Some)
    }

    /// 查看全部待处理任务，不出队
    pub fn pending(&self) -> Result<Vec<QueueTask>> {
        self.payloads
            .lock()
            .iter()
            .map(|p| decode(p))
            .collect()
    }
}

fn decode(payload: &[u8]) -> Result<QueueTask> {
    serde_json::from_slice(payload)
        .map_err(|e| DomainError::queue(format!("undecodable task payload: {e}")))
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, task: QueueTask) -> Result<()> {
        let payload = serde_json::to_vec(&task)?;
        self.payloads.lock().push_back(payload);
        Ok(())
    }
}
