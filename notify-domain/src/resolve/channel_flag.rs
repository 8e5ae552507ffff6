use super::{PostResolutionTransform, ResolutionScope};
use crate::{
    config::NotifyConfig,
    error::DomainResult as Result,
    model::{FlagId, Subscribers},
    ports::{SubscriptionQuery, SubscriptionStore, SubscriptionTarget},
};
use async_trait::async_trait;
use bon::Builder;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// 渠道标记变换
///
/// 用户以 `<subscribe_prefix><x>` 订阅、同时又在上下文中的实体上持有
/// `<channel_prefix><x>` 标记时，为其追加对应渠道。
/// 例如 `subscribe_node` + `email_node` → `email`。
#[derive(Builder)]
pub struct ChannelFlagTransform {
    store: Arc<dyn SubscriptionStore>,
    /// 必须与订阅来源使用的前缀一致
    #[builder(into)]
    subscribe_prefix: String,
    #[builder(into, default = "email_".to_string())]
    channel_prefix: String,
    #[builder(into, default = "email".to_string())]
    channel: String,
}

impl ChannelFlagTransform {
    /// 订阅标记前缀取自 `NotifyConfig::flag_prefix`，渠道标记沿用默认值
    pub fn from_config(store: Arc<dyn SubscriptionStore>, config: &NotifyConfig) -> Self {
        Self::builder()
            .store(store)
            .subscribe_prefix(config.flag_prefix.clone())
            .build()
    }
}

#[async_trait]
impl PostResolutionTransform for ChannelFlagTransform {
    fn transform_name(&self) -> &str {
        "channel-flag"
    }

    async fn transform(
        &self,
        mut subscribers: Subscribers,
        scope: &ResolutionScope<'_>,
    ) -> Result<Subscribers> {
        if subscribers.is_empty() {
            return Ok(subscribers);
        }

        // 渠道标记 ID → 对应的订阅标记名
        let flags = self.store.flags().await?;
        let counterparts: HashMap<FlagId, String> = flags
            .iter()
            .filter_map(|f| {
                let suffix = f.name.strip_prefix(&self.channel_prefix)?;
                Some((f.id, format!("{}{}", self.subscribe_prefix, suffix)))
            })
            .collect();

        let targets: Vec<SubscriptionTarget> = scope
            .context
            .iter()
            .filter_map(|(entity_type, ids)| {
                let flag_ids: BTreeSet<FlagId> = flags
                    .iter()
                    .filter(|f| f.entity_type == entity_type && counterparts.contains_key(&f.id))
                    .map(|f| f.id)
                    .collect();
                (!flag_ids.is_empty()).then(|| SubscriptionTarget {
                    entity_type: entity_type.to_string(),
                    entity_ids: ids.clone(),
                    flag_ids,
                })
            })
            .collect();
        if targets.is_empty() {
            return Ok(subscribers);
        }

        let query = SubscriptionQuery::builder()
            .targets(targets)
            .users(subscribers.keys().copied().collect())
            .build();

        for row in self.store.find(&query).await? {
            let Some(subscribe_flag) = counterparts.get(&row.flag_id) else {
                continue;
            };
            if let Some(record) = subscribers.get_mut(&row.user_id) {
                if record.has_flag(subscribe_flag) {
                    record.add_notifier(self.channel.as_str());
                }
            }
        }
        Ok(subscribers)
    }
}
