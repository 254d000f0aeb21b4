pub mod chat;
pub mod event;
pub mod types;

pub use chat::{ChatChunk, ChatCompletionRequest, ChatCompletionResponse, ChatUsage, FinishReason};
pub use event::{EventKind, InboundEvent, MessageContent, OutgoingMessage, SourceKind};
pub use types::{ChatMessage, ModelInfo, Role};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
