//! # Storage Error Types
//!
//! 定义会话存储相关的错误类型。"不存在" 和 "已过期" 不是错误。

use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// 存储后端不可用
    #[error("Storage backend unavailable: {message}")]
    Unavailable { message: String },
}

impl StorageError {
    /// 创建不可用错误
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// 存储结果类型
pub type StorageResult<T> = Result<T, StorageError>;
