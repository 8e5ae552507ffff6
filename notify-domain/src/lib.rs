//! 订阅通知领域层（notify-domain）
//!
//! 针对“某个内容实体上发生的事件”，解析应当被通知的用户集合，并通过一个或多个
//! 可插拔的通知渠道（notifier）逐一投递：
//! - 上下文推导（`context`）：从事件实体出发，收集作者、所属分组、分类词条等相关实体；
//! - 订阅者解析（`resolve`）：聚合各订阅来源（provider），执行权限与“自我通知”过滤，
//!   合并每个用户的渠道偏好，并经后置变换（transform）处理；
//! - 投递引擎（`dispatch`）：同步或队列模式下逐个用户投递，支持截止时间中断，
//!   并以游标（最后处理的用户 ID）在后续队列周期中精确续投；
//! - 端口（`ports`）：存储、实体加载、权限、队列与渠道等外部协作者的协议。
//!
//! 典型用法：
//! 1. 实现或选择 `ports` 中的各端口（测试与示例可直接使用 `inmemory`）；
//! 2. 使用 `ContextExtractor::standard` 与 `SubscriberResolver::builder` 装配解析器；
//! 3. 通过 `DispatchEngine::builder` 构建引擎并调用 `send`；
//! 4. 队列模式下由外部调度周期性取出 `QueueTask` 并交给 `QueueWorker::run_task`。
//!
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod ports;
pub mod resolve;

#[cfg(feature = "inmemory")]
pub mod inmemory;

pub use config::NotifyConfig;
pub use error::{DomainError, DomainResult};
