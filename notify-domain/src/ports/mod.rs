//! 端口（ports）
//!
//! 本子系统依赖的外部协作者协议：实体加载、消息仓储、查看权限、订阅存储、
//! 分组关系、任务队列与通知渠道。只定义接口，具体实现由上层注入；
//! 测试与示例可直接使用 `crate::inmemory` 中的内存实现。
//!
pub mod access;
pub mod entity_loader;
pub mod group_membership;
pub mod message_repository;
pub mod notifier;
pub mod subscription_store;
pub mod task_queue;

pub use access::AccessChecker;
pub use entity_loader::EntityLoader;
pub use group_membership::GroupMembership;
pub use message_repository::MessageRepository;
pub use notifier::{Notifier, NotifierInvoker, NotifierRegistry};
pub use subscription_store::{
    Subscription, SubscriptionFlag, SubscriptionQuery, SubscriptionStore, SubscriptionTarget,
};
pub use task_queue::TaskQueue;
