//! # Conversation Session
//!
//! 单个用户的对话状态。历史按时间顺序保存，长度不超过 `max_turns * 2`。

use chrono::{DateTime, Duration, Utc};
use parley_core::ChatMessage;

/// 默认会话超时（分钟）
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: u64 = 30;

/// 默认最大轮数
pub const DEFAULT_MAX_TURNS: usize = 10;

/// 对话会话
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSession {
    /// 外部用户标识，存储的键
    pub user_id: String,
    /// 按时间顺序排列的历史消息
    messages: Vec<ChatMessage>,
    /// 最近一次读写时间
    pub last_access: DateTime<Utc>,
    timeout: Duration,
    max_turns: usize,
}

impl ConversationSession {
    /// 创建新会话；`max_turns` 至少为 1
    pub fn new(user_id: impl Into<String>, timeout: Duration, max_turns: usize) -> Self {
        Self {
            user_id: user_id.into(),
            messages: Vec::new(),
            last_access: Utc::now(),
            timeout,
            max_turns: max_turns.max(1),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// 是否已过期（严格大于超时时间才算过期）
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_access) > self.timeout
    }

    pub fn touch(&mut self) {
        self.last_access = Utc::now();
    }

    /// 追加一轮对话（一条用户消息加一条助手消息）
    ///
    /// 达到上限时先丢弃最旧的一轮。
    pub fn add_turn(&mut self, user: ChatMessage, assistant: ChatMessage) {
        let capacity = self.max_turns * 2;
        while self.messages.len() + 2 > capacity && self.messages.len() >= 2 {
            self.messages.drain(..2);
        }
        self.messages.push(user);
        self.messages.push(assistant);
    }

    /// 历史消息的副本
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn turn_count(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(i: usize) -> (ChatMessage, ChatMessage) {
        (
            ChatMessage::user(format!("question {}", i)),
            ChatMessage::assistant(format!("answer {}", i)),
        )
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = ConversationSession::new("U1", Duration::minutes(30), 10);
        assert_eq!(session.user_id, "U1");
        assert!(session.history().is_empty());
        assert_eq!(session.turn_count(), 0);
        assert!(!session.is_expired());
    }

    #[test]
    fn test_history_bounded_and_fifo() {
        let mut session = ConversationSession::new("U1", Duration::minutes(30), 3);
        for i in 0..10 {
            let (u, a) = turn(i);
            session.add_turn(u, a);
            assert!(session.messages().len() <= 6);
        }

        let history = session.history();
        assert_eq!(history.len(), 6);
        assert_eq!(history[0], ChatMessage::user("question 7"));
        assert_eq!(history[1], ChatMessage::assistant("answer 7"));
        assert_eq!(history[5], ChatMessage::assistant("answer 9"));
    }

    #[test]
    fn test_add_turn_below_limit_keeps_everything() {
        let mut session = ConversationSession::new("U1", Duration::minutes(30), 5);
        for i in 0..3 {
            let (u, a) = turn(i);
            session.add_turn(u, a);
        }
        assert_eq!(session.turn_count(), 3);
        assert_eq!(session.history()[0], ChatMessage::user("question 0"));
    }

    #[test]
    fn test_zero_max_turns_keeps_one_turn() {
        let mut session = ConversationSession::new("U1", Duration::minutes(30), 0);
        assert_eq!(session.max_turns(), 1);
        for i in 0..3 {
            let (u, a) = turn(i);
            session.add_turn(u, a);
        }
        assert_eq!(session.history(), vec![ChatMessage::user("question 2"), ChatMessage::assistant("answer 2")]);
    }

    #[test]
    fn test_expiry_boundary() {
        let timeout = Duration::minutes(30);
        let session = ConversationSession::new("U1", timeout, 10);
        let base = session.last_access;

        assert!(!session.is_expired_at(base + timeout - Duration::seconds(1)));
        assert!(!session.is_expired_at(base + timeout));
        assert!(session.is_expired_at(base + timeout + Duration::milliseconds(1)));
    }

    #[test]
    fn test_history_is_a_copy() {
        let mut session = ConversationSession::new("U1", Duration::minutes(30), 10);
        let (u, a) = turn(0);
        session.add_turn(u, a);

        let mut copy = session.history();
        copy.clear();
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut session = ConversationSession::new("U1", Duration::minutes(30), 10);
        let (u, a) = turn(0);
        session.add_turn(u, a);
        session.clear();
        assert!(session.history().is_empty());
    }
}
