//! 内存版端口实现（inmemory）
//!
//! 各端口的轻量实现，典型用途：测试环境、示例与本地开发。
//! 不做持久化，进程退出即丢失。
//!
mod access;
mod entities;
mod groups;
mod messages;
mod queue;
mod store;

pub use access::DenyListAccess;
pub use entities::InMemoryEntityLoader;
pub use groups::InMemoryGroupMembership;
pub use messages::InMemoryMessageRepository;
pub use queue::InMemoryTaskQueue;
pub use store::InMemorySubscriptionStore;
