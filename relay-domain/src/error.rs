//! 领域层统一错误定义
//!
//! 聚焦序列化、事件解码、账本与锁表、配置与调度等最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化/事件解码 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("unknown event type: {event_type}")]
    UnknownEventType { event_type: String },

    // --- 分发 ---
    #[error("duplicate listener id: {listener_id}")]
    DuplicateListener { listener_id: String },
    #[error("dispatcher is no longer available")]
    DispatcherGone,

    // --- 账本/锁表/持久化 ---
    #[error("publication ledger error: {reason}")]
    Ledger { reason: String },
    #[error("lock store error: lock={lock}, reason={reason}")]
    Lock { lock: String, reason: String },
    #[error("database error: {reason}")]
    Database { reason: String },
    #[error("not found: {reason}")]
    NotFound { reason: String },

    // --- 配置/时间 ---
    #[error("config error: {reason}")]
    Config { reason: String },
    #[error("invalid duration: {reason}")]
    InvalidDuration { reason: String },
}

impl DomainError {
    pub fn ledger(reason: impl Into<String>) -> Self {
        DomainError::Ledger {
            reason: reason.into(),
        }
    }

    pub fn lock(lock: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::Lock {
            lock: lock.into(),
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        DomainError::Config {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

// 基础设施错误统一折叠进 DomainError，实现层可直接使用 `?`

#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound {
                reason: "row not found".to_string(),
            },
            other => DomainError::Database {
                reason: other.to_string(),
            },
        }
    }
}

impl From<toml::de::Error> for DomainError {
    fn from(err: toml::de::Error) -> Self {
        DomainError::Config {
            reason: err.to_string(),
        }
    }
}

impl From<chrono::OutOfRangeError> for DomainError {
    fn from(err: chrono::OutOfRangeError) -> Self {
        DomainError::InvalidDuration {
            reason: err.to_string(),
        }
    }
}
