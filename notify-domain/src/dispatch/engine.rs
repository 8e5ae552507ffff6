use crate::{
    config::NotifyConfig,
    error::DomainResult as Result,
    model::{
        ChannelOptions, Context, DispatchOptions, Entity, Message, NotifyOptions, QueueTask,
        Subscribers, UserId,
    },
    ports::{MessageRepository, NotifierInvoker, TaskQueue},
    resolve::SubscriberResolver,
};
use bon::Builder;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 投递引擎
///
/// 同步模式下一次处理全部接收者；队列模式下首次调用只入队，之后每个队列周期
/// 处理一批接收者（受 `range` 与截止时间约束），并以推进后的游标生成下一个任务。
#[derive(Builder)]
pub struct DispatchEngine {
    resolver: SubscriberResolver,
    messages: Arc<dyn MessageRepository>,
    notifier: Arc<dyn NotifierInvoker>,
    queue: Arc<dyn TaskQueue>,
}

/// 一个周期内的接收者批次
struct Batch {
    recipients: Subscribers,
    context: Context,
    /// 本批次已覆盖到的最大用户 ID（含被过滤掉的候选）
    scanned_through: Option<UserId>,
}

impl DispatchEngine {
    pub fn config(&self) -> &NotifyConfig {
        self.resolver.config()
    }

    pub fn resolver(&self) -> &SubscriberResolver {
        &self.resolver
    }

    /// 投递一条消息，返回原始消息（必要时已持久化）
    pub async fn send(
        &self,
        entity: &Entity,
        mut message: Message,
        notify_options: NotifyOptions,
        options: DispatchOptions,
        context: Context,
    ) -> Result<Message> {
        let options = options.normalized(self.config());

        if !message.is_saved() && options.save_message {
            let id = self.messages.save(&message).await?;
            message.assign_id(id);
            debug!(message_id = id, template = message.template(), "message saved");
        }

        if options.queued() && !options.inside_queue_cycle {
            self.enqueue_first(entity, &message, notify_options, options, context)
                .await?;
            return Ok(message);
        }

        let batch = self.next_batch(entity, &message, &options, context).await?;
        let cursor = options.last_user_id;
        if batch.recipients.is_empty() && batch.scanned_through <= cursor {
            debug!(message_id = message.id(), cursor, "no recipients left");
            return Ok(message);
        }

        let canonical = Arc::new(message);
        let queued = options.queued();
        let mut last_processed: Option<UserId> = None;
        let mut interrupted = false;

        'recipients: for (user_id, record) in &batch.recipients {
            let mut recipient = Message::for_recipient(&canonical, *user_id, record);
            last_processed = Some(*user_id);

            for channel in record.notifiers() {
                let channel_options = notify_options.get(channel).copied().unwrap_or_default();
                self.deliver(&mut recipient, channel, channel_options).await;

                if queued && options.deadline_passed(Utc::now()) {
                    interrupted = true;
                    break 'recipients;
                }
            }
        }

        if interrupted {
            info!(
                message_id = canonical.id(),
                last_user_id = last_processed,
                "deadline reached, dispatch interrupted"
            );
        }

        if queued {
            let next_cursor = if interrupted {
                last_processed
            } else {
                last_processed.max(batch.scanned_through)
            };
            if next_cursor > cursor {
                let mut next = options.clone();
                next.last_user_id = next_cursor;
                next.inside_queue_cycle = false;
                let task = QueueTask::new(&canonical, entity, notify_options, next, batch.context)?;
                self.queue.enqueue(task).await?;
                debug!(
                    message_id = canonical.id(),
                    cursor = next_cursor,
                    "follow-up task enqueued"
                );
            }
        }

        Ok(Arc::unwrap_or_clone(canonical))
    }

    /// 队列模式的首次调用：推导上下文后入队，不处理任何接收者
    async fn enqueue_first(
        &self,
        entity: &Entity,
        message: &Message,
        notify_options: NotifyOptions,
        options: DispatchOptions,
        context: Context,
    ) -> Result<()> {
        let mut task = QueueTask::new(message, entity, notify_options, options, Context::new())?;
        task.context = self
            .resolver
            .extractor()
            .extract(entity, &task.subscribe_options, context)
            .await?;
        task.subscribe_options.skip_context = true;

        let message_id = task.message_id;
        self.queue.enqueue(task).await?;
        info!(
            message_id,
            entity_type = entity.entity_type(),
            entity_id = entity.id(),
            "message queued for dispatch"
        );
        Ok(())
    }

    async fn next_batch(
        &self,
        entity: &Entity,
        message: &Message,
        options: &DispatchOptions,
        context: Context,
    ) -> Result<Batch> {
        if options.explicit_recipients.is_empty() {
            let resolution = self
                .resolver
                .resolve_batch(entity, message, options, context)
                .await?;
            return Ok(Batch {
                recipients: resolution.subscribers,
                context: resolution.context,
                scanned_through: resolution.scanned_through,
            });
        }

        let cursor = options.last_user_id;
        let recipients: Subscribers = options
            .explicit_recipients
            .iter()
            .filter(|(user_id, _)| Some(**user_id) > cursor)
            .take(options.range.unwrap_or(usize::MAX))
            .map(|(user_id, record)| (*user_id, record.clone()))
            .collect();
        let scanned_through = recipients.keys().next_back().copied();
        Ok(Batch {
            recipients,
            context,
            scanned_through,
        })
    }

    /// 单渠道投递；失败只记录日志，按渠道选项保存投递记录
    async fn deliver(&self, recipient: &mut Message, channel: &str, options: ChannelOptions) {
        recipient.set_channel(channel);
        let outcome = self.notifier.invoke(recipient, &options, channel).await;

        let keep_record = match &outcome {
            Ok(()) => {
                debug!(user_id = recipient.target(), channel, "notification sent");
                options.save_on_success
            }
            Err(err) => {
                warn!(
                    user_id = recipient.target(),
                    channel,
                    error = %err,
                    "notification failed"
                );
                options.save_on_failure
            }
        };
        if !keep_record {
            return;
        }

        match self.messages.save(recipient).await {
            Ok(id) => {
                if !recipient.is_saved() {
                    recipient.assign_id(id);
                }
            }
            Err(err) => warn!(
                user_id = recipient.target(),
                channel,
                error = %err,
                "failed to save delivery record"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextExtractor;
    use crate::error::DomainError;
    use crate::inmemory::{
        DenyListAccess, InMemoryEntityLoader, InMemoryMessageRepository,
        InMemorySubscriptionStore, InMemoryTaskQueue,
    };
    use crate::model::SubscriptionRecord;
    use crate::resolve::{FlagSubscriberProvider, SubscriberProvider};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(UserId, String)>>,
        failing: BTreeSet<String>,
    }

    impl Recorder {
        fn failing(channel: &str) -> Self {
            Self {
                failing: BTreeSet::from([channel.to_string()]),
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<(UserId, String)> {
            self.sent.lock().unwrap().clone()
        }

        fn users(&self) -> Vec<UserId> {
            self.sent().into_iter().map(|(user, _)| user).collect()
        }
    }

    #[async_trait]
    impl NotifierInvoker for Recorder {
        async fn invoke(
            &self,
            message: &Message,
            _options: &ChannelOptions,
            channel: &str,
        ) -> anyhow::Result<()> {
            if self.failing.contains(channel) {
                anyhow::bail!("{channel} transport down");
            }
            let user = message.target().unwrap_or_default();
            self.sent.lock().unwrap().push((user, channel.to_string()));
            Ok(())
        }
    }

    struct Harness {
        store: Arc<InMemorySubscriptionStore>,
        access: Arc<DenyListAccess>,
        messages: Arc<InMemoryMessageRepository>,
        queue: Arc<InMemoryTaskQueue>,
        notifier: Arc<Recorder>,
        engine: DispatchEngine,
    }

    fn harness(notifier: Recorder) -> Harness {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let access = Arc::new(DenyListAccess::default());
        let messages = Arc::new(InMemoryMessageRepository::new());
        let queue = Arc::new(InMemoryTaskQueue::new());
        let notifier = Arc::new(notifier);

        let entities = Arc::new(InMemoryEntityLoader::new());
        entities.insert(doc1());

        let resolver = SubscriberResolver::builder()
            .extractor(ContextExtractor::standard(
                &NotifyConfig::default(),
                entities,
                None,
            ))
            .access(access.clone())
            .providers(vec![
                Arc::new(FlagSubscriberProvider::new(store.clone(), "subscribe_"))
                    as Arc<dyn SubscriberProvider>,
            ])
            .build();
        let engine = DispatchEngine::builder()
            .resolver(resolver)
            .messages(messages.clone())
            .notifier(notifier.clone())
            .queue(queue.clone())
            .build();

        Harness {
            store,
            access,
            messages,
            queue,
            notifier,
            engine,
        }
    }

    fn doc1() -> Entity {
        Entity::builder().entity_type("node").id(1).owner(1).build()
    }

    fn message() -> Message {
        Message::builder().template("node_updated").owner(1).build()
    }

    fn subscribe(h: &Harness, users: &[UserId]) {
        let flag = h.store.define_flag("subscribe_node", "node");
        for user in users {
            h.store.subscribe(flag, "node", 1, *user);
        }
    }

    fn cycle() -> DispatchOptions {
        DispatchOptions::builder()
            .use_queue(true)
            .inside_queue_cycle(true)
            .build()
    }

    async fn saved_message(h: &Harness) -> Message {
        let mut message = message();
        let id = h.messages.save(&message).await.unwrap();
        message.assign_id(id);
        message
    }

    #[tokio::test]
    async fn synchronous_send_reaches_every_subscriber() {
        let h = harness(Recorder::default());
        subscribe(&h, &[1, 2, 3]);

        let out = h
            .engine
            .send(
                &doc1(),
                message(),
                NotifyOptions::new(),
                DispatchOptions::default(),
                Context::new(),
            )
            .await
            .unwrap();

        assert_eq!(out.id(), Some(1));
        assert_eq!(out.target(), None);
        assert_eq!(
            h.notifier.sent(),
            vec![(2, "email".to_string()), (3, "email".to_string())]
        );
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn unsaved_message_cannot_be_queued() {
        let h = harness(Recorder::default());
        subscribe(&h, &[2]);
        let options = DispatchOptions::builder()
            .use_queue(true)
            .save_message(false)
            .build();

        let err = h
            .engine
            .send(&doc1(), message(), NotifyOptions::new(), options, Context::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidState { .. }));
        assert!(h.queue.is_empty());
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn queued_send_enqueues_exactly_one_task() {
        let h = harness(Recorder::default());
        subscribe(&h, &[2, 3]);
        let options = DispatchOptions::builder().use_queue(true).build();

        let out = h
            .engine
            .send(&doc1(), message(), NotifyOptions::new(), options, Context::new())
            .await
            .unwrap();

        assert!(h.notifier.sent().is_empty());
        let tasks = h.queue.pending().unwrap();
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(Some(task.message_id), out.id());
        assert_eq!(task.cursor(), None);
        assert!(task.subscribe_options.skip_context);
        assert!(!task.subscribe_options.inside_queue_cycle);
        assert_eq!(task.subscribe_options.range, Some(100));
        assert!(task.context.contains("node", 1));
        assert!(task.context.contains("user", 1));
    }

    #[tokio::test]
    async fn deadline_interrupts_at_channel_granularity() {
        let h = harness(Recorder::default());
        let message = saved_message(&h).await;
        let recipients: Subscribers = [
            (1, SubscriptionRecord::new(["subscribe_node"], ["email", "sms"])),
            (2, SubscriptionRecord::new(["subscribe_node"], ["email"])),
            (3, SubscriptionRecord::new(["subscribe_node"], ["email"])),
        ]
        .into_iter()
        .collect();
        let mut options = cycle();
        options.explicit_recipients = recipients;
        options.deadline = Some(Utc::now() - Duration::seconds(1));

        h.engine
            .send(&doc1(), message, NotifyOptions::new(), options, Context::new())
            .await
            .unwrap();

        assert_eq!(h.notifier.sent(), vec![(1, "email".to_string())]);
        let tasks = h.queue.pending().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].cursor(), Some(1));
    }

    #[tokio::test]
    async fn deadline_is_ignored_in_synchronous_mode() {
        let h = harness(Recorder::default());
        let recipients: Subscribers = [2, 3, 4]
            .into_iter()
            .map(|user| (user, SubscriptionRecord::new(Vec::<String>::new(), ["email", "sms"])))
            .collect();
        let options = DispatchOptions::builder()
            .use_queue(false)
            .explicit_recipients(recipients)
            .deadline(Utc::now() - Duration::seconds(1))
            .build();

        h.engine
            .send(&doc1(), message(), NotifyOptions::new(), options, Context::new())
            .await
            .unwrap();

        assert_eq!(h.notifier.users(), vec![2, 2, 3, 3, 4, 4]);
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn queue_cycle_uses_the_stored_context() {
        let h = harness(Recorder::default());
        let term = h.store.define_flag("subscribe_term", "taxonomy_term");
        // doc1 已不再引用词条 10，重新推导的上下文里不会有它
        h.store.subscribe(term, "taxonomy_term", 10, 4);
        let message = saved_message(&h).await;
        let stored: Context = [("node", vec![1]), ("taxonomy_term", vec![10])]
            .into_iter()
            .collect();
        let mut options = cycle();
        options.skip_context = true;

        h.engine
            .send(&doc1(), message, NotifyOptions::new(), options, stored.clone())
            .await
            .unwrap();

        assert_eq!(h.notifier.users(), vec![4]);
        let task = h.queue.claim().unwrap().unwrap();
        assert_eq!(task.context, stored);
        assert_eq!(task.cursor(), Some(4));
    }

    #[tokio::test]
    async fn range_pages_through_subscribers_until_empty() {
        let h = harness(Recorder::default());
        subscribe(&h, &[9, 3, 5]);
        let message = saved_message(&h).await;
        let mut options = cycle();
        options.range = Some(2);

        h.engine
            .send(
                &doc1(),
                message.clone(),
                NotifyOptions::new(),
                options.clone(),
                Context::new(),
            )
            .await
            .unwrap();
        assert_eq!(h.notifier.users(), vec![3, 5]);
        let task = h.queue.claim().unwrap().unwrap();
        assert_eq!(task.cursor(), Some(5));

        options.last_user_id = task.cursor();
        h.engine
            .send(&doc1(), message.clone(), NotifyOptions::new(), options.clone(), task.context)
            .await
            .unwrap();
        assert_eq!(h.notifier.users(), vec![3, 5, 9]);
        let task = h.queue.claim().unwrap().unwrap();
        assert_eq!(task.cursor(), Some(9));

        options.last_user_id = task.cursor();
        h.engine
            .send(&doc1(), message, NotifyOptions::new(), options, task.context)
            .await
            .unwrap();
        assert_eq!(h.notifier.users(), vec![3, 5, 9]);
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn fully_filtered_batch_still_advances_the_cursor() {
        let h = harness(Recorder::default());
        subscribe(&h, &[3, 5, 9]);
        h.access.deny(3, "node", 1);
        h.access.deny(5, "node", 1);
        let message = saved_message(&h).await;
        let mut options = cycle();
        options.range = Some(2);

        h.engine
            .send(&doc1(), message, NotifyOptions::new(), options, Context::new())
            .await
            .unwrap();

        assert!(h.notifier.sent().is_empty());
        let task = h.queue.claim().unwrap().unwrap();
        assert_eq!(task.cursor(), Some(5));
    }

    #[tokio::test]
    async fn failed_channel_is_recorded_and_loop_continues() {
        let h = harness(Recorder::failing("sms"));
        let recipients: Subscribers = [
            (2, SubscriptionRecord::new(Vec::<String>::new(), ["email", "sms"])),
            (3, SubscriptionRecord::new(Vec::<String>::new(), ["email"])),
        ]
        .into_iter()
        .collect();
        let notify_options: NotifyOptions = [(
            "sms".to_string(),
            ChannelOptions {
                save_on_failure: true,
                save_on_success: false,
            },
        )]
        .into_iter()
        .collect();
        let options = DispatchOptions::builder().explicit_recipients(recipients).build();

        h.engine
            .send(&doc1(), message(), notify_options, options, Context::new())
            .await
            .unwrap();

        assert_eq!(
            h.notifier.sent(),
            vec![(2, "email".to_string()), (3, "email".to_string())]
        );
        let stored = h.messages.all();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].target(), None);
        assert_eq!(stored[1].target(), Some(2));
    }

    #[tokio::test]
    async fn explicit_recipients_respect_cursor_and_range() {
        let h = harness(Recorder::default());
        let message = saved_message(&h).await;
        let recipients: Subscribers = [4, 6, 8, 10]
            .into_iter()
            .map(|user| (user, SubscriptionRecord::new(Vec::<String>::new(), ["email"])))
            .collect();
        let mut options = cycle();
        options.explicit_recipients = recipients;
        options.last_user_id = Some(4);
        options.range = Some(2);

        h.engine
            .send(&doc1(), message, NotifyOptions::new(), options, Context::new())
            .await
            .unwrap();

        assert_eq!(h.notifier.users(), vec![6, 8]);
        let task = h.queue.claim().unwrap().unwrap();
        assert_eq!(task.cursor(), Some(8));
    }
}
