pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod stream;
pub mod transformer;

pub use backend::ChatBackend;
pub use client::LmStudioClient;
pub use config::LmStudioConfig;
pub use error::{ConversionError, LLMError, Result};
pub use retry::RetryPolicy;
pub use stream::{CompletionStream, STREAM_BUFFER_SIZE};
pub use transformer::OpenAiTransformer;
