use super::{MessageId, SubscriptionRecord, UserId};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Weak};

/// 通知消息
///
/// 持久化一次后只读；投递时为每个接收者克隆一份（清空 ID、设置接收者），
/// 克隆体通过弱引用指回原始消息，供需要未修改原文的渠道读取。
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct Message {
    /// 持久化后才存在
    id: Option<MessageId>,
    /// 消息模板（类型）名
    #[builder(into)]
    template: String,
    /// 触发该消息的用户
    owner: UserId,
    /// 接收者，仅在单个接收者的克隆体上设置
    target: Option<UserId>,
    /// 模板参数
    #[builder(default)]
    arguments: BTreeMap<String, Value>,
    #[builder(default = Utc::now())]
    created_at: DateTime<Utc>,
    /// 投递中的临时状态，不持久化
    #[serde(skip)]
    #[builder(skip)]
    delivery: Option<DeliveryState>,
    #[serde(skip)]
    #[builder(skip)]
    original: Weak<Message>,
}

/// 单个接收者投递过程中的临时状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryState {
    pub user_id: UserId,
    /// 命中的订阅标记
    pub flags: Vec<String>,
    /// 该接收者请求的全部渠道
    pub notifiers: BTreeSet<String>,
    /// 正在投递的渠道
    pub channel: Option<String>,
}

impl Message {
    pub fn id(&self) -> Option<MessageId> {
        self.id
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn target(&self) -> Option<UserId> {
        self.target
    }

    pub fn arguments(&self) -> &BTreeMap<String, Value> {
        &self.arguments
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn delivery(&self) -> Option<&DeliveryState> {
        self.delivery.as_ref()
    }

    /// 克隆体对应的原始消息；原始消息已释放或本身即原始消息时为 None
    pub fn original(&self) -> Option<Arc<Message>> {
        self.original.upgrade()
    }

    /// 由仓储在持久化后回填 ID
    pub fn assign_id(&mut self, id: MessageId) {
        self.id = Some(id);
    }

    /// 为单个接收者生成克隆体
    pub(crate) fn for_recipient(
        canonical: &Arc<Message>,
        user_id: UserId,
        record: &SubscriptionRecord,
    ) -> Message {
        let mut message = Message::clone(canonical);
        message.id = None;
        message.target = Some(user_id);
        message.original = Arc::downgrade(canonical);
        message.delivery = Some(DeliveryState {
            user_id,
            flags: record.flags().to_vec(),
            notifiers: record.notifiers().clone(),
            channel: None,
        });
        message
    }

    pub(crate) fn set_channel(&mut self, channel: &str) {
        if let Some(state) = self.delivery.as_mut() {
            state.channel = Some(channel.to_string());
        }
    }
}
