use std::time::Duration;

use async_trait::async_trait;
use parley_core::{ChatCompletionRequest, ChatCompletionResponse, ModelInfo};
use reqwest::{header, Client, RequestBuilder, Response};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::backend::ChatBackend;
use crate::config::LmStudioConfig;
use crate::error::{LLMError, Result};
use crate::retry::RetryPolicy;
use crate::stream::{spawn_producer, CompletionStream};
use crate::transformer::OpenAiTransformer;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_IDLE_PER_HOST: usize = 100;

/// Client for an LM Studio (OpenAI-compatible) server
#[derive(Debug)]
pub struct LmStudioClient {
    http: Client,
    base_url: String,
    default_model: Option<String>,
    retry: RetryPolicy,
    transformer: OpenAiTransformer,
    /// First model listed by the backend, filled on first use
    cached_model: RwLock<Option<String>>,
}

impl LmStudioClient {
    pub fn new(config: LmStudioConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .build()
            .map_err(|e| LLMError::Config(e.to_string()))?;

        let base_url = config.normalized_base_url();
        info!(
            "LM Studio client initialized with base URL: {}, timeout: {:?}",
            base_url, config.timeout
        );

        Ok(Self {
            http,
            base_url,
            default_model: config.model,
            retry: config.retry,
            transformer: OpenAiTransformer::new(),
            cached_model: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Model for a request: per-request override, configured default, or
    /// the first model the backend lists (queried once and cached).
    pub async fn resolve_model(
        &self,
        request: &ChatCompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if let Some(model) = request.model.as_deref().filter(|m| !m.is_empty()) {
            return Ok(model.to_string());
        }
        if let Some(model) = &self.default_model {
            return Ok(model.clone());
        }

        // lock waits must observe the caller's token; the writer may be
        // retrying the model listing for a long time
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LLMError::Cancelled),
            guard = self.cached_model.read() => guard,
        };
        if let Some(model) = read.as_ref() {
            return Ok(model.clone());
        }
        drop(read);

        let mut cached = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LLMError::Cancelled),
            guard = self.cached_model.write() => guard,
        };
        // another task may have filled it while we waited
        if let Some(model) = cached.as_ref() {
            return Ok(model.clone());
        }

        let models = self.list_models_with(&self.retry, cancel).await?;
        let first = models.into_iter().next().ok_or(LLMError::NoModels)?;
        info!("Selected first available model: {}", first.id);
        *cached = Some(first.id.clone());
        Ok(first.id)
    }

    /// Cached model selection, if any
    pub async fn cached_model(&self) -> Option<String> {
        self.cached_model.read().await.clone()
    }

    /// Send a request under the retry policy; non-2xx statuses become errors
    async fn send_with_retry<F>(
        &self,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
        build: F,
    ) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        policy
            .run(cancel, |attempt| {
                let request = build();
                async move {
                    debug!("Backend request attempt {}", attempt);
                    let response = request.send().await?;
                    check_status(response).await
                }
            })
            .await
    }

    async fn list_models_with(
        &self,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<Vec<ModelInfo>> {
        let url = self.url("/v1/models");
        let response = self
            .send_with_retry(policy, cancel, || self.http.get(&url))
            .await?;
        let body = response.text().await?;
        let models = self.transformer.parse_models(&body)?;
        info!("Listed {} models from backend", models.len());
        Ok(models)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LLMError::from_status(status.as_u16(), &body))
}

#[async_trait]
impl ChatBackend for LmStudioClient {
    #[instrument(skip(self, request, cancel), fields(messages = request.messages.len()))]
    async fn complete(
        &self,
        request: ChatCompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletionResponse> {
        let model = self.resolve_model(&request, cancel).await?;
        let body = self.transformer.transform_request(&request, &model, false);
        let url = self.url("/v1/chat/completions");

        let response = self
            .send_with_retry(&self.retry, cancel, || self.http.post(&url).json(&body))
            .await?;

        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LLMError::Cancelled),
            text = response.text() => text?,
        };
        let mut completion = self.transformer.parse_response(&text)?;
        if completion.model.is_empty() {
            completion.model = model;
        }

        debug!(
            "Completion received: {} chars, {} total tokens",
            completion.content.len(),
            completion.usage.total_tokens
        );
        Ok(completion)
    }

    #[instrument(skip(self, request, cancel), fields(messages = request.messages.len()))]
    async fn complete_streaming(
        &self,
        request: ChatCompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionStream> {
        let model = self.resolve_model(&request, cancel).await?;
        let body = self.transformer.transform_request(&request, &model, true);
        let url = self.url("/v1/chat/completions");

        let response = self
            .send_with_retry(&self.retry, cancel, || {
                self.http
                    .post(&url)
                    .header(header::ACCEPT, "text/event-stream")
                    .json(&body)
            })
            .await?;

        Ok(spawn_producer(response, cancel.clone()))
    }

    async fn list_models(&self, cancel: &CancellationToken) -> Result<Vec<ModelInfo>> {
        self.list_models_with(&self.retry, cancel).await
    }

    async fn health_check(&self) -> Result<()> {
        self.list_models_with(&RetryPolicy::no_retry(), &CancellationToken::new())
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::ChatMessage;

    #[tokio::test]
    async fn test_override_and_default_skip_backend() {
        // nothing listens here; resolving must not touch the network
        let client = LmStudioClient::new(
            LmStudioConfig::new("http://127.0.0.1:9/").with_model("configured"),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");

        let cancel = CancellationToken::new();
        let plain = ChatCompletionRequest::new(vec![ChatMessage::user("hi")]);
        assert_eq!(client.resolve_model(&plain, &cancel).await.unwrap(), "configured");

        let overridden = plain.clone().with_model("override");
        assert_eq!(client.resolve_model(&overridden, &cancel).await.unwrap(), "override");
        assert_eq!(client.cached_model().await, None);
    }
}
