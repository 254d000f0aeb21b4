//! # Parley Session
//!
//! 按用户保存的对话会话：过期、有界历史和惰性清理。
//!
//! ## 模块
//!
//! - [`types`]: `ConversationSession`
//! - [`store`]: `SessionStore` trait
//! - [`memory`]: 基于 DashMap 的内存实现
//! - [`error`]: 错误类型

pub mod error;
pub mod memory;
pub mod store;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use memory::MemorySessionStore;
pub use store::SessionStore;
pub use types::{ConversationSession, DEFAULT_MAX_TURNS, DEFAULT_SESSION_TIMEOUT_MINUTES};
