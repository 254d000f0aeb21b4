pub mod chunk;
pub mod request;
pub mod response;

pub use chunk::{ChatChunk, FinishReason};
pub use request::ChatCompletionRequest;
pub use response::{ChatCompletionResponse, ChatUsage};
