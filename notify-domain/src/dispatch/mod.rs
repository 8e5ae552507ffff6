//! 投递（dispatch）
//!
//! - `DispatchEngine`：解析接收者并逐个、逐渠道投递；队列模式下按截止时间中断，
//!   并以游标生成续投任务；
//! - `QueueWorker`：队列任务的执行入口，加载实体与消息后进入一个队列周期。
//!
mod engine;
mod worker;

pub use engine::DispatchEngine;
pub use worker::QueueWorker;
