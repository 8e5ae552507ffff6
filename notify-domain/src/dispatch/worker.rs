use super::DispatchEngine;
use crate::{
    error::{DomainError, DomainResult as Result},
    model::QueueTask,
    ports::{EntityLoader, MessageRepository},
};
use bon::Builder;
use chrono::{TimeDelta, Utc};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

/// 队列任务执行入口
///
/// 任务引用的实体或消息已不存在时直接丢弃（返回 `Ok`）；设置了周期预算时，
/// 以“当前时间 + 预算”作为本周期的截止时间，覆盖快照中的旧值。
#[derive(Builder)]
pub struct QueueWorker {
    entities: Arc<dyn EntityLoader>,
    messages: Arc<dyn MessageRepository>,
    engine: Arc<DispatchEngine>,
    cycle_budget: Option<Duration>,
}

impl QueueWorker {
    pub async fn run_task(&self, task: QueueTask) -> Result<()> {
        let cursor = task.cursor();
        let QueueTask {
            message_id,
            entity_type,
            entity_id,
            notify_options,
            subscribe_options: mut options,
            context,
            ..
        } = task;

        let Some(entity) = self.entities.load(&entity_type, entity_id).await? else {
            debug!(%entity_type, entity_id, message_id, "entity gone, task dropped");
            return Ok(());
        };
        let Some(message) = self.messages.load(message_id).await? else {
            debug!(message_id, "message gone, task dropped");
            return Ok(());
        };

        options.inside_queue_cycle = true;
        options.last_user_id = cursor;
        if let Some(budget) = self.cycle_budget {
            let budget = TimeDelta::from_std(budget)
                .map_err(|e| DomainError::invalid_config(format!("queue cycle budget: {e}")))?;
            options.deadline = Some(Utc::now() + budget);
        }

        info!(message_id, cursor, "queue cycle started");
        self.engine
            .send(&entity, message, notify_options, options, context)
            .await?;
        Ok(())
    }
}
