use anyhow::{Context as _, Result};
use async_trait::async_trait;
use notify_domain::NotifyConfig;
use notify_domain::context::ContextExtractor;
use notify_domain::dispatch::{DispatchEngine, QueueWorker};
use notify_domain::inmemory::{
    DenyListAccess, InMemoryEntityLoader, InMemoryGroupMembership, InMemoryMessageRepository,
    InMemorySubscriptionStore, InMemoryTaskQueue,
};
use notify_domain::model::{
    ChannelOptions, Context, DispatchOptions, Entity, EntityField, EntityRef, Message,
    NotifyOptions,
};
use notify_domain::ports::{GroupMembership, Notifier, NotifierRegistry};
use notify_domain::resolve::{
    ChannelFlagTransform, FlagSubscriberProvider, PostResolutionTransform, SubscriberProvider,
    SubscriberResolver,
};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// 只写日志的渠道
struct LogNotifier {
    channel: &'static str,
}

#[async_trait]
impl Notifier for LogNotifier {
    fn channel_name(&self) -> &str {
        self.channel
    }

    async fn deliver(&self, message: &Message, options: &ChannelOptions) -> anyhow::Result<()> {
        let flags = message.delivery().map(|d| d.flags.join(",")).unwrap_or_default();
        info!(
            channel = self.channel,
            user_id = message.target(),
            original_id = message.original().and_then(|m| m.id()),
            template = message.template(),
            created_at = %message.created_at(),
            flags = %flags,
            save_on_success = options.save_on_success,
            "notify"
        );
        Ok(())
    }
}

fn init_logging() {
    let filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

/// `NOTIFY_CONFIG` 指向 JSON 配置文件；未设置时使用默认配置
fn load_config() -> Result<NotifyConfig> {
    let Ok(path) = std::env::var("NOTIFY_CONFIG") else {
        return Ok(NotifyConfig::default());
    };
    let raw = std::fs::read_to_string(&path).with_context(|| format!("read config {path}"))?;
    let config = NotifyConfig::from_json(&raw).with_context(|| format!("parse config {path}"))?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();
    let config = load_config()?;
    info!(?config, "configuration loaded");

    // 订阅：20 人订阅文档 1，10 人订阅词条 5，偶数用户同时要求邮件
    let store = Arc::new(InMemorySubscriptionStore::new());
    let on_node = store.define_flag(&format!("{}node", config.flag_prefix), "node");
    let on_term = store.define_flag(
        &format!("{}term", config.flag_prefix),
        &config.category_entity_type,
    );
    let email_node = store.define_flag("email_node", "node");
    for user in 1..=20 {
        store.subscribe(on_node, "node", 1, user);
        if user % 2 == 0 {
            store.subscribe(email_node, "node", 1, user);
        }
    }
    for user in 21..=30 {
        store.subscribe(on_term, &config.category_entity_type, 5, user);
    }

    let access = Arc::new(DenyListAccess::default());
    access.deny(13, "node", 1);

    let document = Entity::builder()
        .entity_type("node")
        .id(1)
        .owner(1)
        .fields(vec![EntityField::category("field_tags", vec![5])])
        .build();
    let comment = Entity::builder()
        .entity_type("comment")
        .id(100)
        .owner(2)
        .parent(document.to_ref())
        .build();

    let entities = Arc::new(InMemoryEntityLoader::new());
    entities.insert(document.clone());
    entities.insert(comment.clone());
    let groups = Arc::new(InMemoryGroupMembership::new());
    groups.add("node", 1, EntityRef::new("group", 7));

    let messages = Arc::new(InMemoryMessageRepository::new());
    let queue = Arc::new(InMemoryTaskQueue::new());
    let config = Arc::new(config);

    let resolver = SubscriberResolver::builder()
        .extractor(ContextExtractor::standard(
            &config,
            entities.clone(),
            Some(groups as Arc<dyn GroupMembership>),
        ))
        .access(access)
        .providers(vec![
            Arc::new(FlagSubscriberProvider::new(store.clone(), config.flag_prefix.clone()))
                as Arc<dyn SubscriberProvider>,
        ])
        .transforms(vec![
            Arc::new(ChannelFlagTransform::from_config(store, &config))
                as Arc<dyn PostResolutionTransform>,
        ])
        .config(config.clone())
        .build();
    let notifiers = NotifierRegistry::new(vec![
        Arc::new(LogNotifier { channel: "email" }) as Arc<dyn Notifier>,
        Arc::new(LogNotifier { channel: "sms" }),
    ]);
    let engine = Arc::new(
        DispatchEngine::builder()
            .resolver(resolver)
            .messages(messages.clone())
            .notifier(Arc::new(notifiers))
            .queue(queue.clone())
            .build(),
    );
    let worker = QueueWorker::builder()
        .entities(entities)
        .messages(messages.clone())
        .engine(engine.clone())
        .maybe_cycle_budget(config.queue_cycle_budget())
        .build();

    // 同步投递：评论通知
    let reply = Message::builder()
        .template("comment_posted")
        .owner(2)
        .arguments([("comment".to_string(), serde_json::json!("Looks good"))].into())
        .build();
    let reply = engine
        .send(
            &comment,
            reply,
            NotifyOptions::new(),
            DispatchOptions::builder().use_queue(false).build(),
            Context::new(),
        )
        .await?;
    info!(message_id = reply.id(), "comment notifications sent");

    // 队列投递：文档更新，每周期 8 行
    let update = Message::builder()
        .template("node_updated")
        .owner(1)
        .arguments([("title".to_string(), serde_json::json!("Quarterly report"))].into())
        .build();
    let notify_options: NotifyOptions = [(
        "email".to_string(),
        ChannelOptions {
            save_on_success: true,
            save_on_failure: true,
        },
    )]
    .into();
    let update = engine
        .send(
            &document,
            update,
            notify_options,
            DispatchOptions::builder().use_queue(true).range(8).build(),
            Context::new(),
        )
        .await?;
    info!(message_id = update.id(), pending = queue.len(), "document update queued");

    let mut cycles = 0;
    while let Some(task) = queue.claim()? {
        cycles += 1;
        info!(cycle = cycles, cursor = task.cursor(), "running queue task");
        worker.run_task(task).await?;
    }
    info!(cycles, stored_messages = messages.len(), "queue drained");
    Ok(())
}
