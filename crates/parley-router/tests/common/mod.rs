//! Recording mocks for orchestrator tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use parley_core::{ChatCompletionRequest, ChatCompletionResponse, ModelInfo, OutgoingMessage};
use parley_llm::{ChatBackend, CompletionStream, LLMError};
use parley_router::{MessageSender, SenderError};
use parley_session::{ConversationSession, MemorySessionStore, SessionStore, StorageError, StorageResult};
use tokio_util::sync::CancellationToken;

/// Backend returning queued results in order
#[derive(Default)]
pub struct MockBackend {
    responses: Mutex<VecDeque<Result<String, LLMError>>>,
    pub requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_ok(&self, content: impl Into<String>) {
        self.responses.lock().push_back(Ok(content.into()));
    }

    pub fn push_err(&self, error: LLMError) {
        self.responses.lock().push_back(Err(error));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<ChatCompletionRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn complete(
        &self,
        request: ChatCompletionRequest,
        _cancel: &CancellationToken,
    ) -> parley_llm::Result<ChatCompletionResponse> {
        self.requests.lock().push(request);
        match self.responses.lock().pop_front() {
            Some(Ok(content)) => Ok(ChatCompletionResponse::new(content, "mock-model")),
            Some(Err(e)) => Err(e),
            None => Err(LLMError::NoModels),
        }
    }

    async fn complete_streaming(
        &self,
        _request: ChatCompletionRequest,
        _cancel: &CancellationToken,
    ) -> parley_llm::Result<CompletionStream> {
        Err(LLMError::Stream("streaming not mocked".to_string()))
    }

    async fn list_models(&self, _cancel: &CancellationToken) -> parley_llm::Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo::new("mock-model", "test")])
    }

    async fn health_check(&self) -> parley_llm::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Get(String),
    Put(String, usize),
    Delete(String),
}

/// Memory store that records every call and can be told to fail
#[derive(Default)]
pub struct RecordingStore {
    inner: MemorySessionStore,
    pub calls: Mutex<Vec<StoreCall>>,
    pub fail_get: Mutex<bool>,
    pub fail_put: Mutex<bool>,
    pub fail_delete: Mutex<bool>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn put_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, StoreCall::Put(..)))
            .count()
    }

    pub async fn seed(&self, session: ConversationSession) {
        self.inner.put(session).await.unwrap();
    }

    pub async fn peek(&self, user_id: &str) -> Option<ConversationSession> {
        self.inner.get(user_id).await.unwrap()
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn get(&self, user_id: &str) -> StorageResult<Option<ConversationSession>> {
        self.calls.lock().push(StoreCall::Get(user_id.to_string()));
        if *self.fail_get.lock() {
            return Err(StorageError::unavailable("get failed"));
        }
        self.inner.get(user_id).await
    }

    async fn put(&self, session: ConversationSession) -> StorageResult<()> {
        self.calls
            .lock()
            .push(StoreCall::Put(session.user_id.clone(), session.messages().len()));
        if *self.fail_put.lock() {
            return Err(StorageError::unavailable("put failed"));
        }
        self.inner.put(session).await
    }

    async fn delete(&self, user_id: &str) -> StorageResult<()> {
        self.calls.lock().push(StoreCall::Delete(user_id.to_string()));
        if *self.fail_delete.lock() {
            return Err(StorageError::unavailable("delete failed"));
        }
        self.inner.delete(user_id).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Reply(String, Vec<String>),
    Push(String, String),
}

/// Sender recording deliveries; push calls listed in `fail_push_at` fail
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<Sent>>,
    pub fail_reply: Mutex<bool>,
    pub fail_push_at: Mutex<Vec<usize>>,
    push_calls: Mutex<usize>,
}

impl RecordingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn replies(&self) -> Vec<(String, Vec<String>)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Reply(token, texts) => Some((token, texts)),
                _ => None,
            })
            .collect()
    }

    pub fn pushes(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Push(to, text) => Some((to, text)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn reply(&self, reply_token: &str, messages: Vec<OutgoingMessage>) -> Result<(), SenderError> {
        if *self.fail_reply.lock() {
            return Err(SenderError::Api {
                status: 400,
                body: "Invalid reply token".to_string(),
            });
        }
        let texts = messages.iter().map(|m| m.as_text().to_string()).collect();
        self.sent.lock().push(Sent::Reply(reply_token.to_string(), texts));
        Ok(())
    }

    async fn push(&self, user_id: &str, message: OutgoingMessage) -> Result<(), SenderError> {
        let call = {
            let mut calls = self.push_calls.lock();
            *calls += 1;
            *calls
        };
        if self.fail_push_at.lock().contains(&call) {
            return Err(SenderError::Http("connection reset".to_string()));
        }
        self.sent
            .lock()
            .push(Sent::Push(user_id.to_string(), message.as_text().to_string()));
        Ok(())
    }
}
