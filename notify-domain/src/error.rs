//! 领域层统一错误定义
//!
//! 聚焦状态校验、外部端口（队列/渠道）与序列化的最小必要集合，
//! 便于各适配层统一转换为 `DomainError`。
//!
//! 注意：候选用户无查看权限、单次渠道投递失败都不是错误，分别由解析器与引擎就地处理。
//!
use thiserror::Error;

/// 统一错误类型（最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 状态与资源 ---
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },
    #[error("not found: {reason}")]
    NotFound { reason: String },
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    // --- 外部端口 ---
    #[error("queue error: {reason}")]
    Queue { reason: String },
    #[error("notifier error: channel={channel}, reason={reason}")]
    Notifier { channel: String, reason: String },

    // --- 序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

impl DomainError {
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        DomainError::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        DomainError::NotFound {
            reason: reason.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        DomainError::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn queue(reason: impl Into<String>) -> Self {
        DomainError::Queue {
            reason: reason.into(),
        }
    }

    pub fn notifier(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::Notifier {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
