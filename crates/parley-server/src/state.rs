//! 共享应用状态

use std::sync::Arc;

use parley_llm::ChatBackend;
use parley_router::EventHandler;
use tokio_util::sync::CancellationToken;

/// 应用状态 - 在 main.rs 中创建并共享给所有 handler
#[derive(Clone)]
pub struct AppState {
    /// 事件处理器（对话编排器）
    pub handler: Arc<dyn EventHandler>,
    /// 模型后端，用于健康检查
    pub backend: Arc<dyn ChatBackend>,
    /// LINE channel secret，用于签名校验
    pub channel_secret: Arc<str>,
    /// 服务器关闭令牌，每个事件任务使用其子令牌
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        handler: Arc<dyn EventHandler>,
        backend: Arc<dyn ChatBackend>,
        channel_secret: impl Into<Arc<str>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            handler,
            backend,
            channel_secret: channel_secret.into(),
            shutdown,
        }
    }
}
