use super::SubscriberProvider;
use crate::{
    error::DomainResult as Result,
    model::{Context, DispatchOptions, FlagId, Message, Subscribers},
    ports::{SubscriptionQuery, SubscriptionStore, SubscriptionTarget},
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::trace;

/// 基于订阅标记的订阅来源
///
/// 只考虑名称带有指定前缀、且登记在对应实体类型上的标记。上下文中所有实体类型
/// 合并为一次查询，结果按用户 ID 升序，因此游标与行数限制跨类型同样成立。
pub struct FlagSubscriberProvider {
    store: Arc<dyn SubscriptionStore>,
    prefix: String,
}

impl FlagSubscriberProvider {
    pub fn new(store: Arc<dyn SubscriptionStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl SubscriberProvider for FlagSubscriberProvider {
    fn provider_name(&self) -> &str {
        "flag"
    }

    async fn provide(
        &self,
        _message: &Message,
        options: &DispatchOptions,
        context: &Context,
    ) -> Result<Subscribers> {
        let flags = self.store.flags().await?;
        let names: HashMap<FlagId, &str> = flags
            .iter()
            .filter(|f| f.name.starts_with(&self.prefix))
            .map(|f| (f.id, f.name.as_str()))
            .collect();

        let targets: Vec<SubscriptionTarget> = context
            .iter()
            .filter_map(|(entity_type, ids)| {
                let flag_ids: BTreeSet<FlagId> = flags
                    .iter()
                    .filter(|f| f.entity_type == entity_type && names.contains_key(&f.id))
                    .map(|f| f.id)
                    .collect();
                (!flag_ids.is_empty()).then(|| SubscriptionTarget {
                    entity_type: entity_type.to_string(),
                    entity_ids: ids.clone(),
                    flag_ids,
                })
            })
            .collect();

        let mut subscribers = Subscribers::new();
        if targets.is_empty() {
            return Ok(subscribers);
        }

        let range = options.range.filter(|r| *r > 0);
        let query = SubscriptionQuery::builder()
            .targets(targets)
            .maybe_after_user(options.last_user_id)
            .maybe_limit(range)
            .build();
        let rows = self.store.find(&query).await?;

        let mut remaining = range;
        for row in rows {
            let Some(name) = names.get(&row.flag_id) else {
                continue;
            };
            subscribers.entry(row.user_id).or_default().push_flag(*name);

            if let Some(left) = remaining.as_mut() {
                *left -= 1;
                if *left == 0 {
                    trace!(last_user = row.user_id, "subscription range exhausted");
                    break;
                }
            }
        }
        Ok(subscribers)
    }
}
