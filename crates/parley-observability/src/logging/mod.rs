//! 结构化日志模块
//!
//! 日志级别优先取 `RUST_LOG`，否则使用配置中的级别。

use std::sync::Arc;

use parking_lot::RwLock;
use parley_config::LoggingConfig;
use tracing_subscriber::{
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::error::{ObservabilityError, Result};

/// 日志级别重新加载句柄类型
type ReloadHandle = Handle<EnvFilter, Registry>;

/// 日志输出设置
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// EnvFilter 语法的级别
    pub level: String,
    /// 是否输出 JSON
    pub json_format: bool,
    pub include_target: bool,
    pub include_line_number: bool,
    pub ansi_colors: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_target: true,
            include_line_number: false,
            ansi_colors: true,
        }
    }
}

impl LogSettings {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_json_format(mut self, json: bool) -> Self {
        self.json_format = json;
        // JSON 输出不带颜色控制符
        if json {
            self.ansi_colors = false;
        }
        self
    }
}

impl From<&LoggingConfig> for LogSettings {
    fn from(config: &LoggingConfig) -> Self {
        Self::default()
            .with_level(config.level.clone())
            .with_json_format(config.json)
    }
}

/// 日志管理器
#[derive(Debug)]
pub struct LogManager {
    settings: LogSettings,
    /// 过滤器重新加载句柄
    reload_handle: Arc<RwLock<ReloadHandle>>,
}

impl LogManager {
    /// 安装全局 subscriber
    ///
    /// 进程内只能成功一次，重复调用返回 `ObservabilityError::Init`。
    pub fn init(settings: LogSettings) -> Result<Self> {
        let filter = match std::env::var("RUST_LOG") {
            Ok(directives) if !directives.trim().is_empty() => build_filter(&directives)?,
            _ => build_filter(&settings.level)?,
        };
        let (filter, reload_handle) = reload::Layer::new(filter);

        let registry = tracing_subscriber::registry().with(filter);

        let installed = if settings.json_format {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(settings.include_target)
                .with_line_number(settings.include_line_number)
                .with_ansi(false);
            registry.with(layer).try_init()
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_target(settings.include_target)
                .with_line_number(settings.include_line_number)
                .with_ansi(settings.ansi_colors);
            registry.with(layer).try_init()
        };
        installed.map_err(|e| ObservabilityError::init(e.to_string()))?;

        tracing::info!(
            target: "parley_observability",
            "Log manager initialized with level: {}",
            settings.level
        );

        Ok(Self {
            settings,
            reload_handle: Arc::new(RwLock::new(reload_handle)),
        })
    }

    /// 动态更新日志级别
    pub fn update_level(&mut self, level: &str) -> Result<()> {
        let new_filter = build_filter(level)?;

        self.reload_handle
            .write()
            .modify(|filter| *filter = new_filter)
            .map_err(|e| ObservabilityError::logging(format!("Failed to update log level: {}", e)))?;

        self.settings.level = level.to_string();
        tracing::info!(
            target: "parley_observability",
            "Log level updated to: {}",
            level
        );
        Ok(())
    }

    /// 获取当前设置
    pub fn settings(&self) -> &LogSettings {
        &self.settings
    }
}

/// 构建环境过滤器
pub fn build_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| ObservabilityError::logging(format!("Invalid log level: {}", e)))
}

/// 创建 webhook 请求 span
pub fn create_request_span(request_id: &str) -> tracing::Span {
    tracing::info_span!("request", request_id = %request_id)
}

/// 创建带有用户上下文的 span
pub fn create_user_span(user_id: &str) -> tracing::Span {
    tracing::info_span!("user", user_id = %user_id)
}
