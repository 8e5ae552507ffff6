//! 领域模型（model）
//!
//! 消息、上下文、实体引用、订阅记录、投递选项与队列任务。

mod context;
mod entity;
mod message;
mod options;
mod queue_task;
mod subscription;

pub use context::Context;
pub use entity::{Entity, EntityField, EntityRef, FieldKind};
pub use message::{DeliveryState, Message};
pub use options::{ChannelOptions, DispatchOptions, NotifyOptions};
pub use queue_task::QueueTask;
pub use subscription::{SubscriptionRecord, Subscribers};

/// 用户 ID（按数值升序作为续投游标）
pub type UserId = u64;
/// 实体 ID
pub type EntityId = u64;
/// 消息 ID（持久化后才存在）
pub type MessageId = u64;
/// 订阅标记（订阅规则）ID
pub type FlagId = u64;
