//! 进程级配置（NotifyConfig）
//!
//! 队列开关、是否通知消息作者本人、默认渠道、订阅标记前缀等默认值集中于此，
//! 在构建解析器/引擎时一次性注入，运行期只读。
//!
use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// 订阅通知的进程级配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// 未显式指定时是否使用队列模式
    pub use_queue: bool,
    /// 未显式指定时是否通知消息作者本人
    pub notify_own_actions: bool,
    /// 对每个订阅者追加的默认渠道（已存在的渠道不会被覆盖）
    pub default_notifiers: BTreeSet<String>,
    /// 参与订阅解析的标记名前缀
    pub flag_prefix: String,
    /// 队列模式下单次解析的最大订阅行数
    pub queue_range: usize,
    /// 单个队列周期的时间预算（秒），为空则沿用任务中保存的截止时间
    pub queue_cycle_secs: Option<u64>,
    /// 用户实体类型名
    pub user_entity_type: String,
    /// 容器实体（文档等）类型名
    pub container_entity_type: String,
    /// 分类词条实体类型名
    pub category_entity_type: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            use_queue: false,
            notify_own_actions: false,
            default_notifiers: BTreeSet::from(["email".to_string()]),
            flag_prefix: "subscribe_".to_string(),
            queue_range: 100,
            queue_cycle_secs: Some(60),
            user_entity_type: "user".to_string(),
            container_entity_type: "node".to_string(),
            category_entity_type: "taxonomy_term".to_string(),
        }
    }
}

impl NotifyConfig {
    /// 从 JSON 文本加载，缺省字段取默认值
    pub fn from_json(raw: &str) -> DomainResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.flag_prefix.is_empty() {
            return Err(DomainError::invalid_config("flag_prefix must not be empty"));
        }
        if self.queue_range == 0 {
            return Err(DomainError::invalid_config("queue_range must be positive"));
        }
        Ok(())
    }

    pub fn queue_cycle_budget(&self) -> Option<Duration> {
        self.queue_cycle_secs.map(Duration::from_secs)
    }
}
