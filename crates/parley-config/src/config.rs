use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LLM_BASE_URL: &str = "http://localhost:1234";
pub const DEFAULT_LLM_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: u64 = 30;
pub const DEFAULT_SESSION_MAX_TURNS: usize = 10;
pub const DEFAULT_LINE_API_BASE_URL: &str = "https://api.line.me";

/// 主配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub line: LineConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// 不阻止启动、但应该告知运维的问题
    ///
    /// `load` 发生在日志初始化之前，调用方在日志就绪后输出这些内容。
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.line.has_credentials() {
            warnings.push(
                "LINE channel secret or token is not set; webhook verification and replies will fail"
                    .to_string(),
            );
        }
        warnings
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// LINE Messaging API 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LineConfig {
    /// 签名校验用的 channel secret
    pub channel_secret: String,
    /// 调用 API 用的 channel access token
    pub channel_token: String,
    pub api_base_url: String,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_secret: String::new(),
            channel_token: String::new(),
            api_base_url: DEFAULT_LINE_API_BASE_URL.to_string(),
        }
    }
}

impl LineConfig {
    pub fn has_credentials(&self) -> bool {
        !self.channel_secret.is_empty() && !self.channel_token.is_empty()
    }
}

/// 模型后端配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    /// 为空时使用后端列出的第一个模型
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timeout_seconds: u64,
    pub system_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: None,
            timeout_seconds: DEFAULT_LLM_TIMEOUT_SECONDS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: Some(0.7),
        }
    }
}

impl LlmConfig {
    /// 请求超时；0 视为默认值
    pub fn timeout(&self) -> Duration {
        match self.timeout_seconds {
            0 => Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECONDS),
            secs => Duration::from_secs(secs),
        }
    }
}

/// 会话配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub timeout_minutes: u64,
    pub max_turns: usize,
    /// 过期会话清理间隔（秒），0 表示不清理
    pub purge_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: DEFAULT_SESSION_TIMEOUT_MINUTES,
            max_turns: DEFAULT_SESSION_MAX_TURNS,
            purge_interval_seconds: 300,
        }
    }
}

impl SessionConfig {
    /// 会话超时；0 视为默认值
    pub fn timeout(&self) -> Duration {
        let minutes = match self.timeout_minutes {
            0 => DEFAULT_SESSION_TIMEOUT_MINUTES,
            m => m,
        };
        Duration::from_secs(minutes * 60)
    }

    /// 最大轮数；0 视为默认值
    pub fn effective_max_turns(&self) -> usize {
        match self.max_turns {
            0 => DEFAULT_SESSION_MAX_TURNS,
            n => n,
        }
    }

    pub fn purge_interval(&self) -> Option<Duration> {
        (self.purge_interval_seconds > 0).then(|| Duration::from_secs(self.purge_interval_seconds))
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter 语法，例如 "info" 或 "parley_router=debug,info"
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
