//! 通知渠道（Notifier / NotifierInvoker）
//!
//! `NotifierInvoker` 是引擎调用的入口：按渠道名发送一条通知，失败不重试。
//! `NotifierRegistry` 将渠道名路由到具体的 `Notifier` 实现。
//!
use crate::{
    error::DomainError,
    model::{ChannelOptions, Message},
};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};

/// 按渠道名发送单条通知
#[async_trait]
pub trait NotifierInvoker: Send + Sync {
    async fn invoke(
        &self,
        message: &Message,
        options: &ChannelOptions,
        channel: &str,
    ) -> anyhow::Result<()>;
}

/// 单一渠道的传输实现（邮件、短信等）
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 渠道名称（用于路由与日志）
    fn channel_name(&self) -> &str;
    /// 发送通知
    async fn deliver(&self, message: &Message, options: &ChannelOptions) -> anyhow::Result<()>;
}

#[derive(Clone, Default)]
pub struct NotifierRegistry {
    by_channel: HashMap<String, Arc<dyn Notifier>>,
}

impl NotifierRegistry {
    /// 同名渠道后注册者生效
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        let by_channel = notifiers
            .into_iter()
            .map(|n| (n.channel_name().to_string(), n))
            .collect();
        Self { by_channel }
    }
}

#[async_trait]
impl NotifierInvoker for NotifierRegistry {
    async fn invoke(
        &self,
        message: &Message,
        options: &ChannelOptions,
        channel: &str,
    ) -> anyhow::Result<()> {
        let Some(notifier) = self.by_channel.get(channel) else {
            return Err(DomainError::notifier(channel, "no notifier registered").into());
        };
        notifier.deliver(message, options).await
    }
}
