use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use parley_core::{ChatCompletionRequest, ChatMessage, EventKind, InboundEvent, MessageContent, OutgoingMessage};
use parley_llm::ChatBackend;
use parley_session::{ConversationSession, SessionStore, DEFAULT_MAX_TURNS, DEFAULT_SESSION_TIMEOUT_MINUTES};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::delivery::{split_for_delivery, truncate_input};
use crate::handlers::command::{CommandContext, CommandHandler};
use crate::handlers::EventHandler;
use crate::sender::MessageSender;
use crate::Result;

/// 后端失败时发给用户的固定消息
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I'm having trouble processing your request right now. Please try again later.";

/// 关注事件的欢迎消息
pub const WELCOME_MESSAGE: &str =
    "Welcome! Thank you for adding me as a friend!\n\nType /help to see available commands.";

/// 编排器配置
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// 系统提示词
    pub system_prompt: String,
    /// 会话超时
    pub session_timeout: Duration,
    /// 最大保留轮数
    pub max_turns: usize,
    pub temperature: Option<f32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".to_string(),
            session_timeout: Duration::minutes(DEFAULT_SESSION_TIMEOUT_MINUTES as i64),
            max_turns: DEFAULT_MAX_TURNS,
            temperature: None,
        }
    }
}

/// 对话编排器 - 命令分发、历史拼接、调用后端、保存会话、拆分投递
pub struct ConversationOrchestrator {
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn SessionStore>,
    sender: Arc<dyn MessageSender>,
    commands: CommandHandler,
    config: OrchestratorConfig,
}

impl ConversationOrchestrator {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn SessionStore>,
        sender: Arc<dyn MessageSender>,
        config: OrchestratorConfig,
    ) -> Self {
        let commands = CommandHandler::new(Arc::clone(&store));
        Self {
            backend,
            store,
            sender,
            commands,
            config,
        }
    }

    /// 命令注册表，用于注册自定义命令
    pub fn commands_mut(&mut self) -> &mut CommandHandler {
        &mut self.commands
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// 构建请求：系统消息 + 历史（原顺序） + 新的用户消息
    pub fn build_request(&self, text: &str, history: Vec<ChatMessage>) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.config.system_prompt.clone()));
        messages.extend(history);
        messages.push(ChatMessage::user(text));

        let request = ChatCompletionRequest::new(messages);
        match self.config.temperature {
            Some(t) => request.temperature(t),
            None => request,
        }
    }

    /// 处理一条文本消息，返回要投递的文本片段
    ///
    /// 命令直接返回命令结果；后端失败或返回空内容时返回固定道歉消息且不修改会话。
    #[instrument(skip(self, text, cancel))]
    pub async fn process_text(&self, user_id: &str, text: &str, cancel: &CancellationToken) -> Vec<String> {
        let text = text.trim();

        if CommandHandler::is_command(text) {
            let ctx = CommandContext { user_id };
            return vec![self.commands.execute(&ctx, text).await];
        }

        let session = match self.store.get(user_id).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Failed to load session for user {}: {}", user_id, e);
                None
            }
        };
        let history = session.as_ref().map(|s| s.history()).unwrap_or_default();

        let input = truncate_input(text);
        if input.len() < text.len() {
            warn!(
                "User input truncated from {} to {} chars",
                text.chars().count(),
                input.chars().count()
            );
        }

        let request = self.build_request(input, history);
        debug!("Sending {} messages to backend", request.messages.len());

        let response = match self.backend.complete(request, cancel).await {
            Ok(response) => response,
            Err(e) => {
                error!("Backend error for user {}: {}", user_id, e);
                return vec![APOLOGY_MESSAGE.to_string()];
            }
        };

        if response.content.trim().is_empty() {
            warn!("Backend returned an empty reply for user {}", user_id);
            return vec![APOLOGY_MESSAGE.to_string()];
        }

        let mut session = session.unwrap_or_else(|| {
            ConversationSession::new(user_id, self.config.session_timeout, self.config.max_turns)
        });
        session.add_turn(ChatMessage::user(input), ChatMessage::assistant(response.content.clone()));
        if let Err(e) = self.store.put(session).await {
            warn!("Failed to update session for user {}: {}", user_id, e);
        }

        let split = split_for_delivery(&response.content);
        if split.is_truncated() {
            warn!(
                "Response split into {} pieces, dropped {} trailing chars",
                split.pieces.len(),
                split.dropped_chars
            );
        }
        split.pieces
    }

    /// 第一段走 reply，其余逐条 push；单条 push 失败不影响后续
    pub async fn deliver(&self, user_id: &str, reply_token: Option<&str>, pieces: Vec<String>) -> Result<()> {
        let mut pieces = pieces.into_iter();
        let Some(first) = pieces.next() else {
            return Ok(());
        };

        match reply_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                self.sender
                    .reply(token, vec![OutgoingMessage::text(first)])
                    .await?;
            }
            None => warn!("No reply token for user {}, first message not sent", user_id),
        }

        for (index, piece) in pieces.enumerate() {
            if let Err(e) = self.sender.push(user_id, OutgoingMessage::text(piece)).await {
                error!("Failed to send push message {}: {}", index + 1, e);
            }
        }

        Ok(())
    }

    async fn handle_message(&self, event: &InboundEvent, message: &MessageContent, cancel: &CancellationToken) -> Result<()> {
        let Some(text) = message.as_text() else {
            info!("Ignoring non-text message from user {}: {:?}", event.user_id, message);
            return Ok(());
        };

        let pieces = self.process_text(&event.user_id, text, cancel).await;
        self.deliver(&event.user_id, event.reply_token.as_deref(), pieces).await
    }

    async fn handle_follow(&self, event: &InboundEvent) -> Result<()> {
        info!("User followed: {}", event.user_id);
        self.sender
            .push(&event.user_id, OutgoingMessage::text(WELCOME_MESSAGE))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for ConversationOrchestrator {
    #[instrument(skip(self, event, cancel), fields(event_id = %event.id, user_id = %event.user_id, kind = event.kind_name()))]
    async fn handle_event(&self, event: InboundEvent, cancel: &CancellationToken) -> Result<()> {
        match &event.kind {
            EventKind::Message { message } => self.handle_message(&event, message, cancel).await,
            EventKind::Follow => self.handle_follow(&event).await,
            EventKind::Unfollow => {
                info!("User unfollowed: {}", event.user_id);
                Ok(())
            }
            EventKind::Join | EventKind::Leave => {
                info!("Bot {} event from user {}", event.kind_name(), event.user_id);
                Ok(())
            }
            EventKind::Postback { data } => {
                debug!("Ignoring postback from user {}: {}", event.user_id, data);
                Ok(())
            }
        }
    }
}
