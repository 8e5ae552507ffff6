//! 订阅存储（SubscriptionStore）
//!
//! 订阅规则（标记，flag）的定义与用户对具体实体的订阅行。
//! 查询结果必须按用户 ID 升序返回，续投游标依赖这一顺序。
//!
use crate::{
    error::DomainResult as Result,
    model::{EntityId, FlagId, UserId},
};
use async_trait::async_trait;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 订阅规则定义：名称 + 适用的实体类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFlag {
    pub id: FlagId,
    pub name: String,
    pub entity_type: String,
}

/// 一条订阅行：某用户以某标记订阅了某实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub flag_id: FlagId,
    pub entity_type: String,
    pub entity_id: EntityId,
    pub user_id: UserId,
}

/// 查询目标：同一实体类型下的实体集合与标记集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionTarget {
    pub entity_type: String,
    pub entity_ids: BTreeSet<EntityId>,
    pub flag_ids: BTreeSet<FlagId>,
}

/// 订阅行查询
///
/// 命中任一目标的行，按 `user_id` 升序（同一用户内按标记、实体排序），
/// 仅返回 `user_id > after_user` 的行，最多 `limit` 行。
#[derive(Debug, Clone, Default, Builder)]
pub struct SubscriptionQuery {
    #[builder(default)]
    pub targets: Vec<SubscriptionTarget>,
    /// 只查询这些用户
    pub users: Option<BTreeSet<UserId>>,
    pub after_user: Option<UserId>,
    pub limit: Option<usize>,
}

impl SubscriptionQuery {
    /// 行是否满足除 limit 之外的全部条件
    pub fn matches(&self, row: &Subscription) -> bool {
        if self.after_user.is_some_and(|cursor| row.user_id <= cursor) {
            return false;
        }
        if let Some(users) = &self.users {
            if !users.contains(&row.user_id) {
                return false;
            }
        }
        self.targets.iter().any(|t| {
            t.entity_type == row.entity_type
                && t.entity_ids.contains(&row.entity_id)
                && t.flag_ids.contains(&row.flag_id)
        })
    }
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// 全部订阅规则定义
    async fn flags(&self) -> Result<Vec<SubscriptionFlag>>;

    async fn find(&self, query: &SubscriptionQuery) -> Result<Vec<Subscription>>;
}
