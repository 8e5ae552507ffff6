//! 任务队列（TaskQueue）
//!
//! 队列任务的持久化与周期性调度由外部负责，这里只要求能入队。
//!
use crate::{error::DomainResult as Result, model::QueueTask};
use async_trait::async_trait;

#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, task: QueueTask) -> Result<()>;
}
