use super::{PostResolutionTransform, ResolutionScope, SubscriberProvider};
use crate::{
    config::NotifyConfig,
    context::ContextExtractor,
    error::DomainResult as Result,
    model::{Context, DispatchOptions, Entity, Message, Subscribers, UserId},
    ports::AccessChecker,
};
use bon::Builder;
use std::sync::Arc;
use tracing::{debug, trace};

/// 一次解析的完整结果
#[derive(Debug, Clone)]
pub struct Resolution {
    /// 过滤、合并、变换后的订阅者
    pub subscribers: Subscribers,
    /// 本次实际使用的上下文
    pub context: Context,
    /// 各来源返回的最大候选用户 ID（过滤前）
    pub scanned_through: Option<UserId>,
}

/// 订阅者解析器
///
/// 来源与变换均按注册顺序调用；合并为并集，最终成员与来源顺序无关。
/// 上下文推导器必须显式提供（通常为 `ContextExtractor::standard`）。
#[derive(Builder)]
pub struct SubscriberResolver {
    extractor: ContextExtractor,
    access: Arc<dyn AccessChecker>,
    #[builder(default)]
    providers: Vec<Arc<dyn SubscriberProvider>>,
    #[builder(default)]
    transforms: Vec<Arc<dyn PostResolutionTransform>>,
    #[builder(default)]
    config: Arc<NotifyConfig>,
}

impl SubscriberResolver {
    pub fn extractor(&self) -> &ContextExtractor {
        &self.extractor
    }

    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    /// 解析订阅者（只返回结果映射）
    pub async fn resolve(
        &self,
        entity: &Entity,
        message: &Message,
        options: &DispatchOptions,
        context: Context,
    ) -> Result<Subscribers> {
        Ok(self
            .resolve_batch(entity, message, options, context)
            .await?
            .subscribers)
    }

    pub async fn resolve_batch(
        &self,
        entity: &Entity,
        message: &Message,
        options: &DispatchOptions,
        context: Context,
    ) -> Result<Resolution> {
        let context = self.extractor.extract(entity, options, context).await?;
        let notify_owner = options.notifies_owner(&self.config);

        let mut subscribers = Subscribers::new();
        let mut scanned_through: Option<UserId> = None;

        for provider in &self.providers {
            let candidates = provider.provide(message, options, &context).await?;
            trace!(
                provider = provider.provider_name(),
                candidates = candidates.len(),
                "provider returned candidates"
            );

            for (user_id, record) in candidates {
                scanned_through = scanned_through.max(Some(user_id));

                if !notify_owner && user_id == message.owner() {
                    trace!(user_id, "message owner skipped");
                    continue;
                }
                if options.entity_access_check && !self.access.can_view(user_id, entity).await? {
                    trace!(user_id, "no view access, skipped");
                    continue;
                }
                subscribers.entry(user_id).or_default().merge(record);
            }
        }

        for record in subscribers.values_mut() {
            record.add_default_notifiers(&self.config.default_notifiers);
        }

        let scope = ResolutionScope {
            entity,
            message,
            options,
            context: &context,
        };
        for transform in &self.transforms {
            subscribers = transform.transform(subscribers, &scope).await?;
        }

        debug!(
            entity_type = entity.entity_type(),
            entity_id = entity.id(),
            subscribers = subscribers.len(),
            scanned_through,
            "subscribers resolved"
        );
        Ok(Resolution {
            subscribers,
            context,
            scanned_through,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainResult;
    use crate::inmemory::{DenyListAccess, InMemoryEntityLoader, InMemorySubscriptionStore};
    use crate::model::SubscriptionRecord;
    use crate::resolve::FlagSubscriberProvider;
    use async_trait::async_trait;
    use std::collections::BTreeSet;

    /// 固定返回一组候选的来源
    struct Fixed(Subscribers);
    #[async_trait]
    impl SubscriberProvider for Fixed {
        fn provider_name(&self) -> &str {
            "fixed"
        }
        async fn provide(
            &self,
            _message: &Message,
            _options: &DispatchOptions,
            _context: &Context,
        ) -> DomainResult<Subscribers> {
            Ok(self.0.clone())
        }
    }

    struct DropUser(UserId);
    #[async_trait]
    impl PostResolutionTransform for DropUser {
        fn transform_name(&self) -> &str {
            "drop-user"
        }
        async fn transform(
            &self,
            mut subscribers: Subscribers,
            _scope: &ResolutionScope<'_>,
        ) -> DomainResult<Subscribers> {
            subscribers.remove(&self.0);
            Ok(subscribers)
        }
    }

    fn doc1() -> Entity {
        Entity::builder().entity_type("node").id(1).owner(1).build()
    }

    fn message_by(owner: UserId) -> Message {
        Message::builder().template("node_updated").owner(owner).build()
    }

    fn extractor() -> ContextExtractor {
        ContextExtractor::standard(
            &NotifyConfig::default(),
            Arc::new(InMemoryEntityLoader::new()),
            None,
        )
    }

    fn fixed(entries: Vec<(UserId, SubscriptionRecord)>) -> Arc<dyn SubscriberProvider> {
        Arc::new(Fixed(entries.into_iter().collect()))
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[tokio::test]
    async fn owner_is_excluded_and_default_notifier_added() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let flag = store.define_flag("subscribe_node", "node");
        store.subscribe(flag, "node", 1, 1);
        store.subscribe(flag, "node", 1, 2);

        let resolver = SubscriberResolver::builder()
            .extractor(extractor())
            .access(Arc::new(DenyListAccess::default()))
            .providers(vec![
                Arc::new(FlagSubscriberProvider::new(store, "subscribe_"))
                    as Arc<dyn SubscriberProvider>,
            ])
            .build();

        let out = resolver
            .resolve(&doc1(), &message_by(1), &DispatchOptions::default(), Context::new())
            .await
            .unwrap();

        assert_eq!(out.keys().copied().collect::<Vec<_>>(), vec![2]);
        assert_eq!(out[&2].flags(), ["subscribe_node"]);
        assert_eq!(names(out[&2].notifiers()), vec!["email"]);

        // 允许通知作者本人
        let options = DispatchOptions::builder().notify_message_owner(true).build();
        let out = resolver
            .resolve(&doc1(), &message_by(1), &options, Context::new())
            .await
            .unwrap();
        assert_eq!(out.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn access_filter_can_be_disabled() {
        let access = Arc::new(DenyListAccess::default());
        access.deny(3, "node", 1);
        let resolver = SubscriberResolver::builder()
            .extractor(extractor())
            .access(access)
            .providers(vec![fixed(vec![
                (3, SubscriptionRecord::default()),
                (4, SubscriptionRecord::default()),
            ])])
            .build();

        let checked = resolver
            .resolve(&doc1(), &message_by(1), &DispatchOptions::default(), Context::new())
            .await
            .unwrap();
        assert_eq!(checked.keys().copied().collect::<Vec<_>>(), vec![4]);

        let options = DispatchOptions::builder().entity_access_check(false).build();
        let unchecked = resolver
            .resolve(&doc1(), &message_by(1), &options, Context::new())
            .await
            .unwrap();
        assert_eq!(unchecked.keys().copied().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[tokio::test]
    async fn providers_merge_by_union() {
        let resolver = SubscriberResolver::builder()
            .extractor(extractor())
            .access(Arc::new(DenyListAccess::default()))
            .providers(vec![
                fixed(vec![(5, SubscriptionRecord::new(["subscribe_node"], ["sms"]))]),
                fixed(vec![(5, SubscriptionRecord::new(["subscribe_term"], ["push"]))]),
            ])
            .config(Arc::new(NotifyConfig {
                default_notifiers: BTreeSet::new(),
                ..NotifyConfig::default()
            }))
            .build();

        let out = resolver
            .resolve(&doc1(), &message_by(1), &DispatchOptions::default(), Context::new())
            .await
            .unwrap();
        assert_eq!(out[&5].flags(), ["subscribe_node", "subscribe_term"]);
        assert_eq!(names(out[&5].notifiers()), vec!["push", "sms"]);
    }

    #[tokio::test]
    async fn transforms_run_after_defaults_and_scan_is_reported() {
        let resolver = SubscriberResolver::builder()
            .extractor(extractor())
            .access(Arc::new(DenyListAccess::default()))
            .providers(vec![fixed(vec![
                (1, SubscriptionRecord::default()),
                (6, SubscriptionRecord::new(["subscribe_node"], ["sms"])),
                (8, SubscriptionRecord::default()),
            ])])
            .transforms(vec![Arc::new(DropUser(8)) as Arc<dyn PostResolutionTransform>])
            .build();

        let resolution = resolver
            .resolve_batch(&doc1(), &message_by(1), &DispatchOptions::default(), Context::new())
            .await
            .unwrap();

        assert_eq!(
            resolution.subscribers.keys().copied().collect::<Vec<_>>(),
            vec![6]
        );
        // 显式渠道保留，默认渠道补充
        assert_eq!(names(resolution.subscribers[&6].notifiers()), vec!["email", "sms"]);
        // 过滤前的最大候选 ID
        assert_eq!(resolution.scanned_through, Some(8));
        // 上下文由解析器推导
        assert!(resolution.context.contains("node", 1));
    }

    #[tokio::test]
    async fn resolution_context_includes_the_author() {
        let resolver = SubscriberResolver::builder()
            .extractor(extractor())
            .access(Arc::new(DenyListAccess::default()))
            .build();

        let resolution = resolver
            .resolve_batch(&doc1(), &message_by(1), &DispatchOptions::default(), Context::new())
            .await
            .unwrap();
        assert!(resolution.context.contains("node", 1));
        assert!(resolution.context.contains("user", 1));

        // skip_context 时只有事件实体本身
        let options = DispatchOptions::builder().skip_context(true).build();
        let resolution = resolver
            .resolve_batch(&doc1(), &message_by(1), &options, Context::new())
            .await
            .unwrap();
        assert!(!resolution.context.contains("user", 1));
    }
}
