use super::{Subscribers, UserId};
use crate::config::NotifyConfig;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 单个渠道的投递选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelOptions {
    /// 投递失败时保存投递记录
    pub save_on_failure: bool,
    /// 投递成功时保存投递记录
    pub save_on_success: bool,
}

/// 渠道名 → 投递选项
pub type NotifyOptions = BTreeMap<String, ChannelOptions>;

/// 一次投递的选项
///
/// `use_queue`、`notify_message_owner`、`range` 为空时由 `NotifyConfig` 补齐
/// （见 `normalized`）；其余字段的默认值直接体现在 `Default` 中。
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchOptions {
    /// 消息未持久化时先保存
    #[builder(default = true)]
    pub save_message: bool,
    /// 只用事件实体本身作为上下文
    #[builder(default)]
    pub skip_context: bool,
    /// 续投游标：只处理 ID 大于它的用户
    pub last_user_id: Option<UserId>,
    /// 显式指定的接收者，非空时跳过订阅解析
    #[builder(default)]
    pub explicit_recipients: Subscribers,
    /// 单次解析的最大订阅行数，为空表示不限
    pub range: Option<usize>,
    /// 截止时间（仅队列模式生效）
    pub deadline: Option<DateTime<Utc>>,
    pub use_queue: Option<bool>,
    /// 由队列 worker 设置，表示当前已处于一个队列周期内
    #[builder(default)]
    pub inside_queue_cycle: bool,
    /// 过滤无查看权限的候选用户
    #[builder(default = true)]
    pub entity_access_check: bool,
    pub notify_message_owner: Option<bool>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            save_message: true,
            skip_context: false,
            last_user_id: None,
            explicit_recipients: Subscribers::new(),
            range: None,
            deadline: None,
            use_queue: None,
            inside_queue_cycle: false,
            entity_access_check: true,
            notify_message_owner: None,
        }
    }
}

impl DispatchOptions {
    /// 以配置补齐未指定的项；队列模式下默认限制单次解析行数
    pub fn normalized(mut self, config: &NotifyConfig) -> Self {
        let queued = *self.use_queue.get_or_insert(config.use_queue);
        self.notify_message_owner
            .get_or_insert(config.notify_own_actions);
        // 0 与“不限”等价
        self.range = self.range.filter(|r| *r > 0);
        if queued && self.range.is_none() {
            self.range = Some(config.queue_range);
        }
        self
    }

    pub fn queued(&self) -> bool {
        self.use_queue.unwrap_or(false)
    }

    pub fn notifies_owner(&self, config: &NotifyConfig) -> bool {
        self.notify_message_owner
            .unwrap_or(config.notify_own_actions)
    }

    /// 截止时间已过（未设置截止时间时永不过期）
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}
