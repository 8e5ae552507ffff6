use super::UserId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 单个用户的订阅记录：命中的订阅标记与请求的渠道
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// 按首次出现顺序保存，不重复
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    notifiers: BTreeSet<String>,
}

/// 用户 ID → 订阅记录，按用户 ID 升序
pub type Subscribers = BTreeMap<UserId, SubscriptionRecord>;

impl SubscriptionRecord {
    pub fn new<F, N>(flags: F, notifiers: N) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        let mut record = Self::default();
        for flag in flags {
            record.push_flag(flag);
        }
        record.notifiers = notifiers.into_iter().map(Into::into).collect();
        record
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn notifiers(&self) -> &BTreeSet<String> {
        &self.notifiers
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// 追加标记（已存在则忽略）
    pub fn push_flag(&mut self, flag: impl Into<String>) {
        let flag = flag.into();
        if !self.has_flag(&flag) {
            self.flags.push(flag);
        }
    }

    pub fn add_notifier(&mut self, channel: impl Into<String>) -> bool {
        self.notifiers.insert(channel.into())
    }

    /// 合并另一来源的记录：标记按顺序追加，渠道取并集
    pub fn merge(&mut self, other: SubscriptionRecord) {
        for flag in other.flags {
            self.push_flag(flag);
        }
        self.notifiers.extend(other.notifiers);
    }

    /// 追加默认渠道，只补充缺失项
    pub fn add_default_notifiers<'a, I>(&mut self, defaults: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for channel in defaults {
            if !self.notifiers.contains(channel) {
                self.notifiers.insert(channel.clone());
            }
        }
    }
}
