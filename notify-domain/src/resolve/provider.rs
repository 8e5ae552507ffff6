use crate::{
    error::DomainResult as Result,
    model::{Context, DispatchOptions, Message, Subscribers},
};
use async_trait::async_trait;

/// 订阅来源：返回候选用户 ID → 部分订阅记录
///
/// 需要分页的来源应遵守 `options.last_user_id`（只返回更大的用户 ID）
/// 与 `options.range`（最多读取的订阅行数）。
#[async_trait]
pub trait SubscriberProvider: Send + Sync {
    /// 来源名称（用于日志）
    fn provider_name(&self) -> &str;

    async fn provide(
        &self,
        message: &Message,
        options: &DispatchOptions,
        context: &Context,
    ) -> Result<Subscribers>;
}
