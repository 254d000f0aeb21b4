use async_trait::async_trait;
use parley_core::{ChatCompletionRequest, ChatCompletionResponse, ModelInfo};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::stream::CompletionStream;

/// Chat completion backend
///
/// Every call takes a cancellation token; a cancelled call returns
/// `LLMError::Cancelled` (or, for streams, a terminal "cancelled" chunk).
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Non-streaming completion, retried on transient failures
    async fn complete(
        &self,
        request: ChatCompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletionResponse>;

    /// Streaming completion; only the connection attempt is retried
    async fn complete_streaming(
        &self,
        request: ChatCompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionStream>;

    /// Available models, retried like `complete`
    async fn list_models(&self, cancel: &CancellationToken) -> Result<Vec<ModelInfo>>;

    /// Single-attempt reachability check
    async fn health_check(&self) -> Result<()>;
}
