//! 观测性错误类型

/// 观测性错误类型
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ObservabilityError {
    /// 日志错误
    #[error("Logging error: {message}")]
    Logging { message: String },

    /// 初始化错误
    #[error("Initialization error: {message}")]
    Init { message: String },
}

impl ObservabilityError {
    /// 创建日志错误
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }

    /// 创建初始化错误
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init {
            message: message.into(),
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> &'static str {
        match self {
            Self::Logging { .. } => "logging",
            Self::Init { .. } => "init",
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ObservabilityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ObservabilityError::logging("bad directive");
        assert_eq!(err.category(), "logging");
        assert_eq!(err.to_string(), "Logging error: bad directive");

        let err = ObservabilityError::init("already set");
        assert!(matches!(err, ObservabilityError::Init { .. }));
    }
}
