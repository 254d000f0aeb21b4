//! Parley 日志基础设施
//!
//! 基于 tracing 的结构化日志，支持 JSON 输出和运行时调整日志级别。

pub mod error;
pub mod logging;

pub use error::{ObservabilityError, Result};
pub use logging::{create_request_span, create_user_span, LogManager, LogSettings};
