//! # Memory Session Store
//!
//! 基于 DashMap 的内存会话存储。不同用户的访问落在不同分片上互不阻塞，
//! 同一用户的读-改-写在条目锁内完成。重启后数据丢失。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::StorageResult;
use crate::store::SessionStore;
use crate::types::ConversationSession;

/// 内存会话存储
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, ConversationSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 删除所有已过期的会话，返回删除数量
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            info!("Purged {} expired sessions", removed);
        }
        removed
    }

    /// 启动后台清理任务，直到 `shutdown` 被取消
    pub fn spawn_janitor(
        self: &Arc<Self>,
        interval: StdDuration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 第一次 tick 立即返回
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Session janitor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        store.purge_expired();
                    }
                }
            }
        })
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, user_id: &str) -> StorageResult<Option<ConversationSession>> {
        let now = Utc::now();
        match self.sessions.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired_at(now) {
                    entry.remove();
                    debug!("Session expired for user {}", user_id);
                    Ok(None)
                } else {
                    entry.get_mut().last_access = now;
                    Ok(Some(entry.get().clone()))
                }
            }
            Entry::Vacant(_) => Ok(None),
        }
    }

    async fn put(&self, mut session: ConversationSession) -> StorageResult<()> {
        session.touch();
        debug!(
            "Storing session for user {} ({} messages)",
            session.user_id,
            session.messages().len()
        );
        self.sessions.insert(session.user_id.clone(), session);
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> StorageResult<()> {
        if self.sessions.remove(user_id).is_some() {
            debug!("Deleted session for user {}", user_id);
        }
        Ok(())
    }
}
