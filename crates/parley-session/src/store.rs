//! # Session Store Trait
//!
//! 会话存储的抽象接口，所有实现必须是线程安全的。

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::ConversationSession;

/// 会话存储 trait
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 按用户 ID 获取会话
    ///
    /// 不存在或已过期时返回 `None`；过期的会话会被顺带删除。
    /// 命中时刷新 `last_access` 后返回副本。
    async fn get(&self, user_id: &str) -> StorageResult<Option<ConversationSession>>;

    /// 插入或覆盖会话，并将 `last_access` 设为当前时间
    async fn put(&self, session: ConversationSession) -> StorageResult<()>;

    /// 删除会话，不存在时同样成功
    async fn delete(&self, user_id: &str) -> StorageResult<()>;
}
