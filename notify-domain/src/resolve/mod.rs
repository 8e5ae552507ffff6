//! 订阅者解析（resolve）
//!
//! - `SubscriberProvider`：订阅来源，按上下文返回候选用户及其部分订阅记录；
//! - `PostResolutionTransform`：解析完成后的变换，可增删改结果；
//! - `SubscriberResolver`：聚合各来源、过滤（作者本人/查看权限）、合并并补齐默认渠道；
//! - `FlagSubscriberProvider`：基于订阅标记（flag）的参考来源实现；
//! - `ChannelFlagTransform`：按“渠道标记”为用户追加渠道的参考变换实现。
//!
mod channel_flag;
mod flag_provider;
mod provider;
mod resolver;
mod transform;

pub use channel_flag::ChannelFlagTransform;
pub use flag_provider::FlagSubscriberProvider;
pub use provider::SubscriberProvider;
pub use resolver::{Resolution, SubscriberResolver};
pub use transform::{PostResolutionTransform, ResolutionScope};
