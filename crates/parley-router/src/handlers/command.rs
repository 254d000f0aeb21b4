use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parley_session::SessionStore;
use tracing::{debug, error, info};

/// 命令前缀
pub const COMMAND_PREFIX: char = '/';

pub const HELP_TEXT: &str = "Available commands:\n/help - Show this message\n/about - About this bot\n/echo <text> - Echo your message\n/clear - Clear conversation history";
pub const ABOUT_TEXT: &str = "LINE Bot powered by Rust + axum\nConversations run on a local OpenAI-compatible model";
pub const ECHO_USAGE: &str = "Usage: /echo <text>";
pub const CLEAR_CONFIRMATION: &str = "Conversation history cleared.";

/// 命令执行上下文
pub struct CommandContext<'a> {
    /// 发出命令的用户
    pub user_id: &'a str,
}

/// 命令执行器 trait
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, ctx: &CommandContext<'_>, args: &[String]) -> String;
}

#[async_trait]
impl<F> CommandExecutor for F
where
    F: Fn(&[String]) -> String + Send + Sync,
{
    async fn execute(&self, _ctx: &CommandContext<'_>, args: &[String]) -> String {
        (self)(args)
    }
}

/// clear 命令：删除用户会话
///
/// 删除失败只记录日志，用户总是收到确认消息。
pub struct ClearCommand {
    store: Arc<dyn SessionStore>,
}

impl ClearCommand {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CommandExecutor for ClearCommand {
    async fn execute(&self, ctx: &CommandContext<'_>, _args: &[String]) -> String {
        match self.store.delete(ctx.user_id).await {
            Ok(()) => info!("Cleared conversation history for user {}", ctx.user_id),
            Err(e) => error!("Failed to clear session for user {}: {}", ctx.user_id, e),
        }
        CLEAR_CONFIRMATION.to_string()
    }
}

/// 命令处理器
pub struct CommandHandler {
    /// 命令注册表
    commands: HashMap<String, Box<dyn CommandExecutor>>,
}

impl CommandHandler {
    /// 创建带内置命令的处理器
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let mut handler = Self {
            commands: HashMap::new(),
        };

        handler.register_builtin_commands(store);
        handler
    }

    /// 注册内置命令
    fn register_builtin_commands(&mut self, store: Arc<dyn SessionStore>) {
        self.register("help", |_args: &[String]| HELP_TEXT.to_string());

        self.register("about", |_args: &[String]| ABOUT_TEXT.to_string());

        self.register("echo", |args: &[String]| {
            if args.is_empty() {
                ECHO_USAGE.to_string()
            } else {
                args.join(" ")
            }
        });

        self.register("clear", ClearCommand::new(store));
    }

    /// 注册自定义命令（名称不含前缀，大小写不敏感）
    pub fn register<E>(&mut self, name: impl Into<String>, executor: E)
    where
        E: CommandExecutor + 'static,
    {
        let name = name.into().to_lowercase();
        debug!("Registering command: {}", name);
        self.commands.insert(name, Box::new(executor));
    }

    pub fn is_command(text: &str) -> bool {
        text.trim_start().starts_with(COMMAND_PREFIX)
    }

    /// 解析命令文本，返回 (命令名, 参数)
    pub fn parse_command(text: &str) -> Option<(String, Vec<String>)> {
        let content = text.trim().strip_prefix(COMMAND_PREFIX)?;
        let mut parts = content.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let args = parts.map(|s| s.to_string()).collect();
        Some((name, args))
    }

    /// 执行命令文本，总是返回要回复给用户的文本
    pub async fn execute(&self, ctx: &CommandContext<'_>, text: &str) -> String {
        let Some((name, args)) = Self::parse_command(text) else {
            return unknown_command(text.trim());
        };

        debug!("Executing command: {} with args: {:?}", name, args);
        match self.commands.get(&name) {
            Some(executor) => executor.execute(ctx, &args).await,
            None => unknown_command(&format!("{}{}", COMMAND_PREFIX, name)),
        }
    }
}

fn unknown_command(command: &str) -> String {
    format!("Unknown command: {}\nType /help for available commands", command)
}
